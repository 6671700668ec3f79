use async_trait::async_trait;
use chrono::{DateTime, Utc};

use residence_hub_core::models::IssueType;
use residence_hub_core::{IssueTypeId, PageRequest, Paginated};

use super::PgStore;
use crate::db::RepositoryError;
use crate::db::store::{IssueTypeChanges, IssueTypeStore, NewIssueType};

const ISSUE_TYPE_COLUMNS: &str = "id, name, image_url, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct IssueTypeRow {
    id: IssueTypeId,
    name: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IssueTypeRow> for IssueType {
    fn from(row: IssueTypeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl IssueTypeStore for PgStore {
    async fn create_issue_type(
        &self,
        issue_type: NewIssueType,
    ) -> Result<IssueType, RepositoryError> {
        let row = sqlx::query_as::<_, IssueTypeRow>(&format!(
            "INSERT INTO issue_types (id, name, image_url)
             VALUES ($1, $2, $3)
             RETURNING {ISSUE_TYPE_COLUMNS}"
        ))
        .bind(IssueTypeId::generate())
        .bind(&issue_type.name)
        .bind(&issue_type.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_issue_type(&self, id: IssueTypeId) -> Result<Option<IssueType>, RepositoryError> {
        let row = sqlx::query_as::<_, IssueTypeRow>(&format!(
            "SELECT {ISSUE_TYPE_COLUMNS} FROM issue_types WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_issue_types(
        &self,
        page: PageRequest,
    ) -> Result<Paginated<IssueType>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM issue_types")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, IssueTypeRow>(&format!(
            "SELECT {ISSUE_TYPE_COLUMNS} FROM issue_types
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(i64::try_from(page.take()).unwrap_or(i64::MAX))
        .bind(i64::try_from(page.skip()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(Paginated::new(
            page,
            u64::try_from(total).unwrap_or_default(),
            rows.into_iter().map(Into::into).collect(),
        ))
    }

    async fn update_issue_type(
        &self,
        id: IssueTypeId,
        changes: IssueTypeChanges,
    ) -> Result<IssueType, RepositoryError> {
        let row = sqlx::query_as::<_, IssueTypeRow>(&format!(
            "UPDATE issue_types SET
                name = COALESCE($2, name),
                image_url = COALESCE($3, image_url),
                updated_at = now()
             WHERE id = $1
             RETURNING {ISSUE_TYPE_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.image_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_issue_type(&self, id: IssueTypeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM issue_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
