//! Issue type catalogue.

use serde::Deserialize;
use tracing::{info, instrument};

use residence_hub_core::access::{Operation, SubjectAttrs};
use residence_hub_core::models::IssueType;
use residence_hub_core::{IssueTypeId, PageRequest, Paginated};

use crate::db::store::{IssueTypeChanges, NewIssueType};
use crate::db::{DynStore, IssueTypeStore};
use crate::error::AppError;
use crate::services::{AccessGuard, non_blank};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueType {
    #[serde(rename = "type")]
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueType {
    #[serde(rename = "type")]
    pub name: Option<String>,
    pub image_url: Option<String>,
}

pub struct IssueTypeService {
    store: DynStore,
    guard: AccessGuard,
}

impl IssueTypeService {
    #[must_use]
    pub fn new(store: DynStore) -> Self {
        Self {
            guard: AccessGuard::new(store.clone()),
            store,
        }
    }

    async fn fetch(&self, id: IssueTypeId) -> Result<IssueType, AppError> {
        self.store
            .get_issue_type(id)
            .await?
            .ok_or_else(|| AppError::not_found("issue type"))
    }

    /// # Errors
    ///
    /// - `Forbidden` below the admin tier
    /// - `BadRequest` for a blank name
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id))]
    pub async fn create(
        &self,
        subject: &SubjectAttrs,
        input: CreateIssueType,
    ) -> Result<IssueType, AppError> {
        self.guard
            .check(subject, &IssueType::attrs(), Operation::WRITE_CONTENT)?;
        let issue_type = self
            .store
            .create_issue_type(NewIssueType {
                name: non_blank("type", input.name)?,
                image_url: input.image_url,
            })
            .await?;
        info!(issue_type_id = %issue_type.id, "Issue type created");
        Ok(issue_type)
    }

    /// The whole catalogue, newest first. Open to every subject.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    #[instrument(skip(self))]
    pub async fn list(&self, page: PageRequest) -> Result<Paginated<IssueType>, AppError> {
        Ok(self.store.list_issue_types(page).await?)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the type does not exist.
    #[instrument(skip(self, subject))]
    pub async fn get(
        &self,
        subject: &SubjectAttrs,
        id: IssueTypeId,
    ) -> Result<IssueType, AppError> {
        let issue_type = self.fetch(id).await?;
        self.guard
            .check(subject, &IssueType::attrs(), Operation::Read)?;
        Ok(issue_type)
    }

    /// # Errors
    ///
    /// - `NotFound` if the type does not exist
    /// - `Forbidden` below the admin tier
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id))]
    pub async fn update(
        &self,
        subject: &SubjectAttrs,
        id: IssueTypeId,
        input: UpdateIssueType,
    ) -> Result<IssueType, AppError> {
        self.fetch(id).await?;
        self.guard
            .check(subject, &IssueType::attrs(), Operation::WRITE_CONTENT)?;

        let changes = IssueTypeChanges {
            name: input.name.map(|n| non_blank("type", n)).transpose()?,
            image_url: input.image_url,
        };
        let updated = self.store.update_issue_type(id, changes).await?;
        info!(issue_type_id = %id, "Issue type updated");
        Ok(updated)
    }

    /// Reports filed under the type are kept and lose their type.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the type does not exist
    /// - `Forbidden` below the admin tier
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn delete(&self, subject: &SubjectAttrs, id: IssueTypeId) -> Result<(), AppError> {
        self.fetch(id).await?;
        self.guard
            .check(subject, &IssueType::attrs(), Operation::Delete)?;
        self.store.delete_issue_type(id).await?;
        info!(issue_type_id = %id, "Issue type deleted");
        Ok(())
    }
}
