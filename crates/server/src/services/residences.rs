//! Residence management.

use serde::Deserialize;
use tracing::{info, instrument};

use residence_hub_core::access::{Operation, ResourceAttrs, ResourceKind, SubjectAttrs};
use residence_hub_core::models::Residence;
use residence_hub_core::{PageRequest, Paginated, ResidenceId};

use crate::db::store::{NewResidence, ResidenceChanges, ResidenceFilter};
use crate::db::{DynStore, ResidenceStore};
use crate::error::AppError;
use crate::services::{AccessGuard, non_blank};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResidence {
    pub name: String,
    pub code: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResidence {
    pub name: Option<String>,
    pub code: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub struct ResidenceService {
    store: DynStore,
    guard: AccessGuard,
}

impl ResidenceService {
    #[must_use]
    pub fn new(store: DynStore) -> Self {
        Self {
            guard: AccessGuard::new(store.clone()),
            store,
        }
    }

    async fn fetch(&self, id: ResidenceId) -> Result<Residence, AppError> {
        self.store
            .get_residence(id)
            .await?
            .ok_or_else(|| AppError::not_found("residence"))
    }

    async fn ensure_code_free(
        &self,
        code: &str,
        except: Option<ResidenceId>,
    ) -> Result<(), AppError> {
        match self.store.get_residence_by_code(code).await? {
            Some(existing) if Some(existing.id) != except => Err(AppError::Conflict(format!(
                "residence code {code} already exists"
            ))),
            _ => Ok(()),
        }
    }

    /// # Errors
    ///
    /// - `Forbidden` below the admin tier
    /// - `BadRequest` for a blank name or code
    /// - `Conflict` if the code is taken
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id, code = %input.code))]
    pub async fn create(
        &self,
        subject: &SubjectAttrs,
        input: CreateResidence,
    ) -> Result<Residence, AppError> {
        self.guard.check(
            subject,
            &ResourceAttrs::new(ResourceKind::Residence),
            Operation::WRITE_CONTENT,
        )?;
        let name = non_blank("name", input.name)?;
        let code = non_blank("code", input.code)?;
        self.ensure_code_free(&code, None).await?;

        let residence = self
            .store
            .create_residence(NewResidence {
                name,
                code,
                street: input.street,
                city: input.city,
                state: input.state,
                country: input.country,
                kind: input.kind,
                creator_id: subject.user_id,
            })
            .await?;
        info!(residence_id = %residence.id, "Residence created");
        Ok(residence)
    }

    /// Any authenticated subject may browse residences.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ResidenceFilter,
        page: PageRequest,
    ) -> Result<Paginated<Residence>, AppError> {
        Ok(self.store.list_residences(filter, page).await?)
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the residence does not exist.
    #[instrument(skip(self, subject))]
    pub async fn get(
        &self,
        subject: &SubjectAttrs,
        id: ResidenceId,
    ) -> Result<Residence, AppError> {
        let residence = self.fetch(id).await?;
        self.guard.check(subject, &residence.attrs(), Operation::Read)?;
        Ok(residence)
    }

    /// # Errors
    ///
    /// - `NotFound` if the residence does not exist
    /// - `Forbidden` below the admin tier
    /// - `Conflict` if the new code belongs to another residence
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id))]
    pub async fn update(
        &self,
        subject: &SubjectAttrs,
        id: ResidenceId,
        input: UpdateResidence,
    ) -> Result<Residence, AppError> {
        let residence = self.fetch(id).await?;
        self.guard
            .check(subject, &residence.attrs(), Operation::WRITE_CONTENT)?;

        let name = input.name.map(|n| non_blank("name", n)).transpose()?;
        let code = input.code.map(|c| non_blank("code", c)).transpose()?;
        if let Some(code) = &code {
            self.ensure_code_free(code, Some(id)).await?;
        }

        let updated = self
            .store
            .update_residence(
                id,
                ResidenceChanges {
                    name,
                    code,
                    street: input.street,
                    city: input.city,
                    state: input.state,
                    country: input.country,
                    kind: input.kind,
                },
            )
            .await?;
        info!(residence_id = %id, "Residence updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// - `NotFound` if the residence does not exist
    /// - `Forbidden` below the admin tier
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn delete(&self, subject: &SubjectAttrs, id: ResidenceId) -> Result<(), AppError> {
        let residence = self.fetch(id).await?;
        self.guard
            .check(subject, &residence.attrs(), Operation::Delete)?;
        self.store.delete_residence(id).await?;
        info!(residence_id = %id, "Residence deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use residence_hub_core::{Role, UserId};

    use super::*;
    use crate::db::InMemoryStore;

    fn input(code: &str) -> CreateResidence {
        CreateResidence {
            name: "Garden Court".to_owned(),
            code: code.to_owned(),
            street: Some("12 Elm St".to_owned()),
            city: Some("Porto".to_owned()),
            state: None,
            country: Some("PT".to_owned()),
            kind: Some("APARTMENT".to_owned()),
        }
    }

    fn service() -> ResidenceService {
        ResidenceService::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let service = service();
        let admin = SubjectAttrs::new(UserId::generate(), Role::Admin);
        service.create(&admin, input("RES-1")).await.unwrap();
        let err = service.create(&admin, input("RES-1")).await.unwrap_err();
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_update_keeps_own_code() {
        let service = service();
        let admin = SubjectAttrs::new(UserId::generate(), Role::SuperAdmin);
        let residence = service.create(&admin, input("RES-1")).await.unwrap();
        service.create(&admin, input("RES-2")).await.unwrap();

        let same = UpdateResidence {
            code: Some("RES-1".to_owned()),
            name: Some("Garden Court II".to_owned()),
            ..UpdateResidence::default()
        };
        let updated = service.update(&admin, residence.id, same).await.unwrap();
        assert_eq!(updated.name, "Garden Court II");

        let taken = UpdateResidence {
            code: Some("RES-2".to_owned()),
            ..UpdateResidence::default()
        };
        let err = service.update(&admin, residence.id, taken).await.unwrap_err();
        assert_eq!(err.kind(), "CONFLICT");
    }

    #[tokio::test]
    async fn test_manager_cannot_create() {
        let service = service();
        let manager = SubjectAttrs::new(UserId::generate(), Role::Manager);
        let err = service.create(&manager, input("RES-1")).await.unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_blank_code_is_rejected() {
        let service = service();
        let admin = SubjectAttrs::new(UserId::generate(), Role::Admin);
        let err = service.create(&admin, input("   ")).await.unwrap_err();
        assert_eq!(err.kind(), "VALIDATION");
    }

    #[tokio::test]
    async fn test_anyone_reads_and_filters() {
        let service = service();
        let admin = SubjectAttrs::new(UserId::generate(), Role::Admin);
        let residence = service.create(&admin, input("RES-1")).await.unwrap();
        let resident = SubjectAttrs::new(UserId::generate(), Role::User);
        assert!(service.get(&resident, residence.id).await.is_ok());

        let filter = ResidenceFilter {
            search: Some("elm".to_owned()),
            country: Some("PT".to_owned()),
            ..ResidenceFilter::default()
        };
        let page = service.list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.meta.total_count, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let service = service();
        let admin = SubjectAttrs::new(UserId::generate(), Role::Admin);
        let err = service
            .delete(&admin, ResidenceId::generate())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
    }
}
