//! Issue reports and their status timeline.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument};

use residence_hub_core::access::{
    Operation, ResourceKind, ScopePredicate, SubjectAttrs, build_party_predicate,
    build_scope_predicate,
};
use residence_hub_core::models::IssueReport;
use residence_hub_core::timeline::{TimelineEntry, derive_timeline};
use residence_hub_core::{
    IssueReportId, IssueStatus, IssueTypeId, PageRequest, Paginated, ResidenceId, Role, UserId,
};

use crate::db::store::{IssueReportChanges, IssueReportFilter, IssueReportProgress, NewIssueReport};
use crate::db::{DynStore, IssueReportStore, IssueTypeStore, ResidenceStore, UserStore};
use crate::error::AppError;
use crate::services::{AccessGuard, non_blank};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueReport {
    pub residence_id: ResidenceId,
    pub issue_type_id: Option<IssueTypeId>,
    pub description: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueReport {
    pub issue_type_id: Option<IssueTypeId>,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

/// Status and assignment change. `"assigneeId": null` clears the assignee,
/// a missing key leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueStatus {
    pub status: Option<IssueStatus>,
    #[serde(default, deserialize_with = "present")]
    pub assignee_id: Option<Option<UserId>>,
}

fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReportQuery {
    pub residence_id: Option<ResidenceId>,
    pub status: Option<IssueStatus>,
    pub issue_type_id: Option<IssueTypeId>,
}

/// A report together with its derived history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReportView {
    #[serde(flatten)]
    pub report: IssueReport,
    pub timeline: Vec<TimelineEntry>,
}

impl From<IssueReport> for IssueReportView {
    fn from(report: IssueReport) -> Self {
        Self {
            timeline: derive_timeline(&report),
            report,
        }
    }
}

pub struct IssueReportService {
    store: DynStore,
    guard: AccessGuard,
}

impl IssueReportService {
    #[must_use]
    pub fn new(store: DynStore) -> Self {
        Self {
            guard: AccessGuard::new(store.clone()),
            store,
        }
    }

    async fn fetch(&self, id: IssueReportId) -> Result<IssueReport, AppError> {
        self.store
            .get_issue_report(id)
            .await?
            .ok_or_else(|| AppError::not_found("issue report"))
    }

    async fn ensure_issue_type(&self, id: Option<IssueTypeId>) -> Result<(), AppError> {
        match id {
            Some(id) if self.store.get_issue_type(id).await?.is_none() => {
                Err(AppError::not_found("issue type"))
            }
            _ => Ok(()),
        }
    }

    /// File a report in a residence.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the residence or issue type does not exist
    /// - `Forbidden` unless the reporter is an approved member or elevated
    /// - `BadRequest` for a blank description
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id, residence_id = %input.residence_id))]
    pub async fn create(
        &self,
        subject: &SubjectAttrs,
        input: CreateIssueReport,
    ) -> Result<IssueReport, AppError> {
        if self.store.get_residence(input.residence_id).await?.is_none() {
            return Err(AppError::not_found("residence"));
        }
        if !subject.is_member_of(input.residence_id) {
            self.guard.require_role(
                subject,
                Role::ELEVATED,
                Operation::WRITE_CONTENT,
                ResourceKind::IssueReport,
            )?;
        }
        self.ensure_issue_type(input.issue_type_id).await?;

        let report = self
            .store
            .create_issue_report(NewIssueReport {
                reporter_id: subject.user_id,
                residence_id: input.residence_id,
                issue_type_id: input.issue_type_id,
                description: non_blank("description", input.description)?,
                image_urls: input.image_urls,
            })
            .await?;
        info!(report_id = %report.id, "Issue reported");
        Ok(report)
    }

    /// Reports visible to the subject, newest first.
    ///
    /// Elevated roles see every report, optionally narrowed to one residence.
    /// Anyone else sees the reports they filed or are assigned to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn list(
        &self,
        subject: &SubjectAttrs,
        query: IssueReportQuery,
        page: PageRequest,
    ) -> Result<Paginated<IssueReport>, AppError> {
        let scope: ScopePredicate = if subject.role.is_elevated() {
            build_scope_predicate(subject, query.residence_id)
        } else {
            build_party_predicate(subject, Role::ELEVATED)
        };
        let filter = IssueReportFilter {
            scope,
            residence_id: query.residence_id,
            status: query.status,
            issue_type_id: query.issue_type_id,
        };
        Ok(self.store.list_issue_reports(&filter, page).await?)
    }

    /// # Errors
    ///
    /// - `NotFound` if the report does not exist
    /// - `Forbidden` unless reporter, assignee, creator of a residence the
    ///   reporter belongs to, or elevated
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn get(
        &self,
        subject: &SubjectAttrs,
        id: IssueReportId,
    ) -> Result<IssueReportView, AppError> {
        let report = self.fetch(id).await?;
        self.guard
            .check_issue_report(subject, &report, Operation::Read)
            .await?;
        Ok(report.into())
    }

    /// Edit the description, type, or images.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the report or the new issue type does not exist
    /// - `Forbidden` unless reporter or admin tier
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id))]
    pub async fn update(
        &self,
        subject: &SubjectAttrs,
        id: IssueReportId,
        input: UpdateIssueReport,
    ) -> Result<IssueReport, AppError> {
        let report = self.fetch(id).await?;
        self.guard
            .check_issue_report(subject, &report, Operation::WRITE_CONTENT)
            .await?;

        self.ensure_issue_type(input.issue_type_id).await?;

        let changes = IssueReportChanges {
            issue_type_id: input.issue_type_id,
            description: input
                .description
                .map(|d| non_blank("description", d))
                .transpose()?,
            image_urls: input.image_urls,
        };
        Ok(self.store.update_issue_report(id, changes).await?)
    }

    /// Move the report along or change who handles it.
    ///
    /// # Errors
    ///
    /// - `BadRequest` if neither status nor assignee is given
    /// - `NotFound` if the report or the new assignee does not exist
    /// - `Forbidden` unless assignee, manager, or admin tier
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id))]
    pub async fn update_status(
        &self,
        subject: &SubjectAttrs,
        id: IssueReportId,
        input: UpdateIssueStatus,
    ) -> Result<IssueReport, AppError> {
        if input.status.is_none() && input.assignee_id.is_none() {
            return Err(AppError::BadRequest(
                "status or assigneeId is required".to_owned(),
            ));
        }

        let report = self.fetch(id).await?;
        self.guard
            .check_issue_report(subject, &report, Operation::WRITE_STATUS)
            .await?;
        if let Some(Some(assignee)) = input.assignee_id
            && self.store.get_user(assignee).await?.is_none()
        {
            return Err(AppError::not_found("assignee"));
        }

        let updated = self
            .store
            .update_issue_report_progress(
                id,
                IssueReportProgress {
                    status: input.status,
                    assignee: input.assignee_id,
                },
            )
            .await?;
        info!(
            report_id = %id,
            from = ?report.status,
            to = ?updated.status,
            "Issue report progressed"
        );
        Ok(updated)
    }

    /// # Errors
    ///
    /// - `NotFound` if the report does not exist
    /// - `Forbidden` below the admin tier
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn delete(&self, subject: &SubjectAttrs, id: IssueReportId) -> Result<(), AppError> {
        let report = self.fetch(id).await?;
        self.guard
            .check_issue_report(subject, &report, Operation::Delete)
            .await?;
        self.store.delete_issue_report(id).await?;
        info!(report_id = %id, "Issue report deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use residence_hub_core::Email;
    use residence_hub_core::timeline::TimelineStatus;

    use super::*;
    use crate::db::InMemoryStore;
    use crate::db::store::{NewResidence, NewUser};

    struct Fixture {
        service: IssueReportService,
        reporter: SubjectAttrs,
        caretaker: SubjectAttrs,
        residence: ResidenceId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let mut users = Vec::new();
        for (name, role) in [("rita", Role::User), ("carl", Role::Caretaker)] {
            let user = store
                .create_user(NewUser {
                    name: name.to_owned(),
                    email: Email::parse(&format!("{name}@example.com")).unwrap(),
                    role,
                    is_verified: true,
                })
                .await
                .unwrap();
            users.push(user);
        }
        let residence = store
            .create_residence(NewResidence {
                name: "Seaside".to_owned(),
                code: "RES-500".to_owned(),
                street: None,
                city: None,
                state: None,
                country: None,
                kind: None,
                creator_id: users[1].id,
            })
            .await
            .unwrap();

        Fixture {
            service: IssueReportService::new(store),
            reporter: SubjectAttrs::new(users[0].id, Role::User)
                .with_approved_residences([residence.id]),
            caretaker: SubjectAttrs::new(users[1].id, Role::Caretaker),
            residence: residence.id,
        }
    }

    fn report_input(residence_id: ResidenceId) -> CreateIssueReport {
        CreateIssueReport {
            residence_id,
            issue_type_id: None,
            description: "Kitchen sink leaks".to_owned(),
            image_urls: vec![],
        }
    }

    #[tokio::test]
    async fn test_new_report_has_single_timeline_entry() {
        let f = fixture().await;
        let report = f
            .service
            .create(&f.reporter, report_input(f.residence))
            .await
            .unwrap();
        let view = f.service.get(&f.reporter, report.id).await.unwrap();
        assert_eq!(view.timeline.len(), 1);
        assert_eq!(view.timeline[0].status, TimelineStatus::Pending);
        assert_eq!(view.timeline[0].label, "Reported");
        assert_eq!(view.timeline[0].timestamp, report.created_at);
    }

    #[tokio::test]
    async fn test_unknown_issue_type_is_not_found() {
        let f = fixture().await;
        let input = CreateIssueReport {
            issue_type_id: Some(IssueTypeId::generate()),
            ..report_input(f.residence)
        };
        let err = f.service.create(&f.reporter, input).await.unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
        assert_eq!(err.to_string(), "issue type not found");

        let report = f
            .service
            .create(&f.reporter, report_input(f.residence))
            .await
            .unwrap();
        let err = f
            .service
            .update(
                &f.reporter,
                report.id,
                UpdateIssueReport {
                    issue_type_id: Some(IssueTypeId::generate()),
                    ..UpdateIssueReport::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_non_member_cannot_report() {
        let f = fixture().await;
        let outsider = SubjectAttrs::new(UserId::generate(), Role::User);
        let err = f
            .service
            .create(&outsider, report_input(f.residence))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_assignment_and_progress() {
        let f = fixture().await;
        let report = f
            .service
            .create(&f.reporter, report_input(f.residence))
            .await
            .unwrap();

        // The reporter cannot move their own report along.
        let err = f
            .service
            .update_status(
                &f.reporter,
                report.id,
                UpdateIssueStatus {
                    status: Some(IssueStatus::Resolved),
                    assignee_id: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");

        let manager = SubjectAttrs::new(UserId::generate(), Role::Manager);
        f.service
            .update_status(
                &manager,
                report.id,
                UpdateIssueStatus {
                    status: Some(IssueStatus::InProgress),
                    assignee_id: Some(Some(f.caretaker.user_id)),
                },
            )
            .await
            .unwrap();

        // Assignee resolves.
        let resolved = f
            .service
            .update_status(
                &f.caretaker,
                report.id,
                UpdateIssueStatus {
                    status: Some(IssueStatus::Resolved),
                    assignee_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(resolved.assignee_id, Some(f.caretaker.user_id));

        let view = f.service.get(&f.reporter, report.id).await.unwrap();
        let statuses: Vec<_> = view.timeline.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                TimelineStatus::Pending,
                TimelineStatus::Assigned,
                TimelineStatus::Resolved
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_assignee_is_not_found() {
        let f = fixture().await;
        let report = f
            .service
            .create(&f.reporter, report_input(f.residence))
            .await
            .unwrap();
        let admin = SubjectAttrs::new(UserId::generate(), Role::Admin);
        let err = f
            .service
            .update_status(
                &admin,
                report.id,
                UpdateIssueStatus {
                    status: None,
                    assignee_id: Some(Some(UserId::generate())),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_plain_users_list_own_reports() {
        let f = fixture().await;
        f.service
            .create(&f.reporter, report_input(f.residence))
            .await
            .unwrap();
        f.service
            .create(&f.caretaker, report_input(f.residence))
            .await
            .unwrap();

        let mine = f
            .service
            .list(&f.reporter, IssueReportQuery::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(mine.meta.total_count, 1);

        let all = f
            .service
            .list(&f.caretaker, IssueReportQuery::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.meta.total_count, 2);
    }

    #[test]
    fn test_assignee_null_clears() {
        let clear: UpdateIssueStatus = serde_json::from_str(r#"{"assigneeId": null}"#).unwrap();
        assert_eq!(clear.assignee_id, Some(None));

        let untouched: UpdateIssueStatus =
            serde_json::from_str(r#"{"status": "RESOLVED"}"#).unwrap();
        assert_eq!(untouched.assignee_id, None);
        assert_eq!(untouched.status, Some(IssueStatus::Resolved));
    }
}
