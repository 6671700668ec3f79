//! Membership workflow.
//!
//! A user asks to join a residence, producing a PENDING membership. An
//! authority then decides it:
//!
//! ```text
//! PENDING  -> APPROVED | REJECTED
//! APPROVED -> REJECTED              (revocation)
//! REJECTED -> (terminal, request again)
//! ```
//!
//! Re-applying the current status is a no-op. Every write is conditional on
//! the version read, so two concurrent deciders cannot both win.

use std::collections::BTreeSet;

use serde::Deserialize;
use tracing::{info, instrument};

use residence_hub_core::access::{Operation, SubjectAttrs};
use residence_hub_core::models::{Membership, MembershipDetail, Residence};
use residence_hub_core::{
    JoinStatus, JoinTransition, MembershipId, PageRequest, Paginated, ResidenceId, UserId,
};

use crate::db::store::MembershipFilter;
use crate::db::{DynStore, MembershipStore, ResidenceStore, UserStore};
use crate::error::AppError;
use crate::services::AccessGuard;

/// Body of a membership decision.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decide {
    pub join_status: JoinStatus,
    /// Version the caller last saw. Defaults to the stored version.
    pub expected_version: Option<i32>,
}

pub struct MembershipWorkflow {
    store: DynStore,
    guard: AccessGuard,
}

impl MembershipWorkflow {
    #[must_use]
    pub fn new(store: DynStore) -> Self {
        Self {
            guard: AccessGuard::new(store.clone()),
            store,
        }
    }

    async fn residence(&self, id: ResidenceId) -> Result<Residence, AppError> {
        self.store
            .get_residence(id)
            .await?
            .ok_or_else(|| AppError::not_found("residence"))
    }

    /// Ask for `user_id` to join `residence_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the residence or user does not exist
    /// - `Conflict` if the user already holds a PENDING or APPROVED membership
    #[instrument(skip(self))]
    pub async fn request_join(
        &self,
        user_id: UserId,
        residence_id: ResidenceId,
    ) -> Result<Membership, AppError> {
        self.residence(residence_id).await?;
        if self.store.get_user(user_id).await?.is_none() {
            return Err(AppError::not_found("user"));
        }

        if let Some(existing) = self
            .store
            .find_active_membership(user_id, residence_id)
            .await?
        {
            return Err(AppError::Conflict(format!(
                "membership already {}",
                existing.join_status
            )));
        }

        let membership = self.store.create_membership(user_id, residence_id).await?;
        info!(membership_id = %membership.id, "Join requested");
        Ok(membership)
    }

    /// PENDING memberships of a residence, newest first.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the residence does not exist
    /// - `Forbidden` unless the subject manages memberships there
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn list_pending(
        &self,
        subject: &SubjectAttrs,
        residence_id: ResidenceId,
        page: PageRequest,
        search: Option<String>,
    ) -> Result<Paginated<MembershipDetail>, AppError> {
        self.list_members(subject, residence_id, Some(JoinStatus::Pending), page, search)
            .await
    }

    /// Memberships of a residence in `status`, APPROVED by default.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the residence does not exist
    /// - `Forbidden` unless the subject manages memberships there
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn list_members(
        &self,
        subject: &SubjectAttrs,
        residence_id: ResidenceId,
        status: Option<JoinStatus>,
        page: PageRequest,
        search: Option<String>,
    ) -> Result<Paginated<MembershipDetail>, AppError> {
        let residence = self.residence(residence_id).await?;
        self.guard
            .check_residence_memberships(subject, &residence, Operation::Read)?;

        let filter = MembershipFilter {
            residence_id,
            status: status.unwrap_or(JoinStatus::Approved),
            search,
        };
        Ok(self.store.list_memberships(&filter, page).await?)
    }

    /// Approve or reject a membership.
    ///
    /// # Errors
    ///
    /// - `BadRequest` if `status` is PENDING
    /// - `NotFound` if the membership does not exist
    /// - `Forbidden` unless the subject manages memberships of its residence
    /// - `Conflict` for REJECTED to APPROVED, or when the version is stale
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id, decision = %status))]
    pub async fn decide(
        &self,
        subject: &SubjectAttrs,
        membership_id: MembershipId,
        status: JoinStatus,
        expected_version: Option<i32>,
    ) -> Result<Membership, AppError> {
        if !status.is_decision() {
            return Err(AppError::BadRequest(
                "joinStatus must be APPROVED or REJECTED".to_owned(),
            ));
        }

        let membership = self
            .store
            .get_membership(membership_id)
            .await?
            .ok_or_else(|| AppError::not_found("membership"))?;
        let residence = self.residence(membership.residence_id).await?;
        self.guard
            .check_membership(subject, &membership, &residence, Operation::WRITE_STATUS)?;

        match membership.join_status.transition_to(status) {
            JoinTransition::Unchanged => Ok(membership),
            JoinTransition::Refused => Err(AppError::Conflict(format!(
                "membership cannot move from {} to {status}",
                membership.join_status
            ))),
            JoinTransition::Allowed => {
                let version = expected_version.unwrap_or(membership.version);
                let updated = self
                    .store
                    .update_join_status(membership.id, status, version)
                    .await?;
                info!(
                    membership_id = %updated.id,
                    residence_id = %updated.residence_id,
                    from = %membership.join_status,
                    to = %updated.join_status,
                    "Membership decided"
                );
                Ok(updated)
            }
        }
    }

    /// Residences where `user_id` holds an APPROVED membership.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn approved_residences_of(
        &self,
        user_id: UserId,
    ) -> Result<BTreeSet<ResidenceId>, AppError> {
        Ok(self.store.approved_residences_of(user_id).await?)
    }
}
