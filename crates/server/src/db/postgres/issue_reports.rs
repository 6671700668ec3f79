use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use residence_hub_core::models::IssueReport;
use residence_hub_core::{
    IssueReportId, IssueStatus, IssueTypeId, PageRequest, Paginated, ResidenceId, UserId,
};

use super::{PgStore, ScopeColumns, fetch_count, push_page, push_scope};
use crate::db::RepositoryError;
use crate::db::store::{
    IssueReportChanges, IssueReportFilter, IssueReportProgress, IssueReportStore, NewIssueReport,
};

const REPORT_COLUMNS: &str = "id, reporter_id, residence_id, issue_type_id, description, \
     image_urls, status, assignee_id, created_at, updated_at";

const REPORT_SCOPE: ScopeColumns = ScopeColumns {
    residence: "residence_id",
    owner: "reporter_id",
    concerned: Some("assignee_id"),
};

#[derive(Debug, sqlx::FromRow)]
struct IssueReportRow {
    id: IssueReportId,
    reporter_id: UserId,
    residence_id: ResidenceId,
    issue_type_id: Option<IssueTypeId>,
    description: String,
    image_urls: Vec<String>,
    status: IssueStatus,
    assignee_id: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IssueReportRow> for IssueReport {
    fn from(row: IssueReportRow) -> Self {
        Self {
            id: row.id,
            reporter_id: row.reporter_id,
            residence_id: row.residence_id,
            issue_type_id: row.issue_type_id,
            description: row.description,
            image_urls: row.image_urls,
            status: row.status,
            assignee_id: row.assignee_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a IssueReportFilter) {
    push_scope(qb, &filter.scope, &REPORT_SCOPE);
    if let Some(residence) = filter.residence_id {
        qb.push(" AND residence_id = ").push_bind(residence);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(issue_type) = filter.issue_type_id {
        qb.push(" AND issue_type_id = ").push_bind(issue_type);
    }
}

#[async_trait]
impl IssueReportStore for PgStore {
    async fn create_issue_report(
        &self,
        report: NewIssueReport,
    ) -> Result<IssueReport, RepositoryError> {
        let row = sqlx::query_as::<_, IssueReportRow>(&format!(
            "INSERT INTO issue_reports (id, reporter_id, residence_id, issue_type_id, description, image_urls)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(IssueReportId::generate())
        .bind(report.reporter_id)
        .bind(report.residence_id)
        .bind(report.issue_type_id)
        .bind(&report.description)
        .bind(&report.image_urls)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_issue_report(
        &self,
        id: IssueReportId,
    ) -> Result<Option<IssueReport>, RepositoryError> {
        let row = sqlx::query_as::<_, IssueReportRow>(&format!(
            "SELECT {REPORT_COLUMNS} FROM issue_reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_issue_reports(
        &self,
        filter: &IssueReportFilter,
        page: PageRequest,
    ) -> Result<Paginated<IssueReport>, RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM issue_reports WHERE TRUE");
        push_filters(&mut count, filter);
        let total = fetch_count(count, &self.pool).await?;

        let mut select = QueryBuilder::new(format!(
            "SELECT {REPORT_COLUMNS} FROM issue_reports WHERE TRUE"
        ));
        push_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC");
        push_page(&mut select, page);
        let rows: Vec<IssueReportRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Paginated::new(
            page,
            total,
            rows.into_iter().map(Into::into).collect(),
        ))
    }

    async fn update_issue_report(
        &self,
        id: IssueReportId,
        changes: IssueReportChanges,
    ) -> Result<IssueReport, RepositoryError> {
        let row = sqlx::query_as::<_, IssueReportRow>(&format!(
            "UPDATE issue_reports SET
                issue_type_id = COALESCE($2, issue_type_id),
                description = COALESCE($3, description),
                image_urls = COALESCE($4, image_urls),
                updated_at = now()
             WHERE id = $1
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.issue_type_id)
        .bind(&changes.description)
        .bind(&changes.image_urls)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn update_issue_report_progress(
        &self,
        id: IssueReportId,
        progress: IssueReportProgress,
    ) -> Result<IssueReport, RepositoryError> {
        let row = sqlx::query_as::<_, IssueReportRow>(&format!(
            "UPDATE issue_reports SET
                status = COALESCE($2, status),
                assignee_id = CASE WHEN $3 THEN $4 ELSE assignee_id END,
                updated_at = now()
             WHERE id = $1
             RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .bind(progress.status)
        .bind(progress.assignee.is_some())
        .bind(progress.assignee.flatten())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_issue_report(&self, id: IssueReportId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM issue_reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
