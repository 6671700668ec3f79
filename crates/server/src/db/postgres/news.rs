use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;

use residence_hub_core::access::ScopePredicate;
use residence_hub_core::models::News;
use residence_hub_core::{NewsId, PageRequest, Paginated, ResidenceId, UserId};

use super::{PgStore, ScopeColumns, fetch_count, push_page, push_scope};
use crate::db::RepositoryError;
use crate::db::store::{NewNews, NewsChanges, NewsStore};

const NEWS_COLUMNS: &str =
    "id, author_id, residence_id, title, content, image_url, created_at, updated_at";

const NEWS_SCOPE: ScopeColumns = ScopeColumns {
    residence: "residence_id",
    owner: "author_id",
    concerned: None,
};

#[derive(Debug, sqlx::FromRow)]
struct NewsRow {
    id: NewsId,
    author_id: UserId,
    residence_id: ResidenceId,
    title: String,
    content: String,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NewsRow> for News {
    fn from(row: NewsRow) -> Self {
        Self {
            id: row.id,
            author_id: row.author_id,
            residence_id: row.residence_id,
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl NewsStore for PgStore {
    async fn create_news(&self, news: NewNews) -> Result<News, RepositoryError> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            "INSERT INTO news (id, author_id, residence_id, title, content, image_url)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {NEWS_COLUMNS}"
        ))
        .bind(NewsId::generate())
        .bind(news.author_id)
        .bind(news.residence_id)
        .bind(&news.title)
        .bind(&news.content)
        .bind(&news.image_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_news(&self, id: NewsId) -> Result<Option<News>, RepositoryError> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            "SELECT {NEWS_COLUMNS} FROM news WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_news(
        &self,
        scope: &ScopePredicate,
        page: PageRequest,
    ) -> Result<Paginated<News>, RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM news WHERE TRUE");
        push_scope(&mut count, scope, &NEWS_SCOPE);
        let total = fetch_count(count, &self.pool).await?;

        let mut select = QueryBuilder::new(format!("SELECT {NEWS_COLUMNS} FROM news WHERE TRUE"));
        push_scope(&mut select, scope, &NEWS_SCOPE);
        select.push(" ORDER BY created_at DESC");
        push_page(&mut select, page);
        let rows: Vec<NewsRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Paginated::new(
            page,
            total,
            rows.into_iter().map(Into::into).collect(),
        ))
    }

    async fn update_news(&self, id: NewsId, changes: NewsChanges) -> Result<News, RepositoryError> {
        let row = sqlx::query_as::<_, NewsRow>(&format!(
            "UPDATE news SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                image_url = COALESCE($4, image_url),
                updated_at = now()
             WHERE id = $1
             RETURNING {NEWS_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.content)
        .bind(&changes.image_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_news(&self, id: NewsId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
