//! Access guard.
//!
//! Binds the pure policy in `residence_hub_core::access` to the store: loads
//! the subject's approved residences once per request and fills in residence
//! creators when a rule admits the creator relation.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use residence_hub_core::access::{
    AccessDenied, Decision, Grant, Operation, Relation, ResourceAttrs, ResourceKind,
    SubjectAttrs, authorize, can_access, rule_for,
};
use residence_hub_core::models::{IssueReport, Membership, Residence};
use residence_hub_core::{Role, UserId};

use crate::db::{DynStore, MembershipStore, ResidenceStore, UserStore};
use crate::error::AppError;

#[derive(Clone)]
pub struct AccessGuard {
    store: DynStore,
}

impl AccessGuard {
    #[must_use]
    pub const fn new(store: DynStore) -> Self {
        Self { store }
    }

    /// Build the subject for `user_id` with its current role and approved
    /// residences. Returns `None` if the user no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    #[instrument(skip(self))]
    pub async fn load_subject(&self, user_id: UserId) -> Result<Option<SubjectAttrs>, AppError> {
        let Some(user) = self.store.get_user(user_id).await? else {
            return Ok(None);
        };
        let approved = self.store.approved_residences_of(user.id).await?;
        Ok(Some(
            SubjectAttrs::new(user.id, user.role).with_approved_residences(approved),
        ))
    }

    /// Authorize against already complete resource attributes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` on deny.
    pub fn check(
        &self,
        subject: &SubjectAttrs,
        resource: &ResourceAttrs,
        operation: Operation,
    ) -> Result<Grant, AppError> {
        Ok(authorize(subject, resource, operation)?)
    }

    /// Authorize an operation on a membership of `residence`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` on deny.
    pub fn check_membership(
        &self,
        subject: &SubjectAttrs,
        membership: &Membership,
        residence: &Residence,
        operation: Operation,
    ) -> Result<Grant, AppError> {
        let attrs = membership
            .attrs()
            .with_residence_creators([residence.creator_id]);
        self.check(subject, &attrs, operation)
    }

    /// Authorize an operation on the memberships of `residence` as a whole,
    /// such as listing them.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` on deny.
    pub fn check_residence_memberships(
        &self,
        subject: &SubjectAttrs,
        residence: &Residence,
        operation: Operation,
    ) -> Result<Grant, AppError> {
        let attrs = ResourceAttrs::new(ResourceKind::Membership)
            .with_residence(residence.id)
            .with_residence_creators([residence.creator_id]);
        self.check(subject, &attrs, operation)
    }

    /// Authorize an operation on an issue report.
    ///
    /// When the direct relations deny and the rule admits the creator
    /// relation, the report escalates: reporter, then the reporter's approved
    /// residences, then the creators of those residences.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` on deny, `AppError::Database` if the
    /// escalation lookup fails.
    #[instrument(skip(self, subject, report), fields(report_id = %report.id))]
    pub async fn check_issue_report(
        &self,
        subject: &SubjectAttrs,
        report: &IssueReport,
        operation: Operation,
    ) -> Result<Grant, AppError> {
        let attrs = report.attrs();
        if let Decision::Allow(grant) = can_access(subject, &attrs, operation) {
            return Ok(grant);
        }
        if !rule_for(attrs.kind, operation).admits(Relation::ResidenceCreator) {
            return Err(AccessDenied {
                operation,
                kind: attrs.kind,
            }
            .into());
        }

        let reporter_residences: BTreeSet<_> =
            self.store.approved_residences_of(report.reporter_id).await?;
        let creators = self.store.creators_of(&reporter_residences).await?;
        debug!(
            reporter_residences = reporter_residences.len(),
            creators = creators.len(),
            "issue report escalation"
        );
        self.check(subject, &attrs.with_residence_creators(creators), operation)
    }

    /// Require one of `allowed` roles for an operation no single resource
    /// answers for, such as publishing into a residence.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` if the subject's role is not listed.
    pub fn require_role(
        &self,
        subject: &SubjectAttrs,
        allowed: &[Role],
        operation: Operation,
        kind: ResourceKind,
    ) -> Result<(), AppError> {
        if subject.role.is_one_of(allowed) {
            Ok(())
        } else {
            debug!(user_id = %subject.user_id, role = %subject.role, %operation, "role required");
            Err(AccessDenied { operation, kind }.into())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use residence_hub_core::{Email, JoinStatus};

    use super::*;
    use crate::db::store::{NewIssueReport, NewResidence, NewUser};
    use crate::db::{InMemoryStore, IssueReportStore};

    async fn user(store: &InMemoryStore, name: &str, role: Role) -> UserId {
        store
            .create_user(NewUser {
                name: name.to_owned(),
                email: Email::parse(&format!("{name}@example.com")).unwrap(),
                role,
                is_verified: true,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_load_subject_missing_user() {
        let guard = AccessGuard::new(Arc::new(InMemoryStore::new()));
        assert!(guard.load_subject(UserId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_creator_escalation_on_issue_report() {
        let store = Arc::new(InMemoryStore::new());
        let creator = user(&store, "creator", Role::User).await;
        let reporter = user(&store, "reporter", Role::User).await;
        let stranger = user(&store, "stranger", Role::User).await;

        let residence = store
            .create_residence(NewResidence {
                name: "North Tower".to_owned(),
                code: "RES-300".to_owned(),
                street: None,
                city: None,
                state: None,
                country: None,
                kind: None,
                creator_id: creator,
            })
            .await
            .unwrap();
        let membership = store.create_membership(reporter, residence.id).await.unwrap();
        store
            .update_join_status(membership.id, JoinStatus::Approved, membership.version)
            .await
            .unwrap();
        let report = store
            .create_issue_report(NewIssueReport {
                reporter_id: reporter,
                residence_id: residence.id,
                issue_type_id: None,
                description: "Leaking pipe".to_owned(),
                image_urls: vec![],
            })
            .await
            .unwrap();

        let guard = AccessGuard::new(store);
        let creator_subject = guard.load_subject(creator).await.unwrap().unwrap();
        let grant = guard
            .check_issue_report(&creator_subject, &report, Operation::Read)
            .await
            .unwrap();
        assert_eq!(grant, Grant::Relation(Relation::ResidenceCreator));

        let stranger_subject = guard.load_subject(stranger).await.unwrap().unwrap();
        let denied = guard
            .check_issue_report(&stranger_subject, &report, Operation::Read)
            .await;
        assert!(matches!(denied, Err(AppError::Forbidden(_))));

        // Escalation grants viewing only.
        let write = guard
            .check_issue_report(&creator_subject, &report, Operation::WRITE_CONTENT)
            .await;
        assert!(matches!(write, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_require_role() {
        let guard = AccessGuard::new(Arc::new(InMemoryStore::new()));
        let subject = SubjectAttrs::new(UserId::generate(), Role::Caretaker);
        assert!(
            guard
                .require_role(
                    &subject,
                    Role::ADMIN_TIER,
                    Operation::WRITE_CONTENT,
                    ResourceKind::News
                )
                .is_err()
        );
        assert!(
            guard
                .require_role(
                    &subject,
                    Role::ELEVATED,
                    Operation::WRITE_CONTENT,
                    ResourceKind::News
                )
                .is_ok()
        );
    }
}
