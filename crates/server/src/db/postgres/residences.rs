use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use residence_hub_core::models::Residence;
use residence_hub_core::{PageRequest, Paginated, ResidenceId, UserId};

use super::{PgStore, fetch_count, like_pattern, push_page, search_term};
use crate::db::store::{NewResidence, ResidenceChanges, ResidenceFilter, ResidenceStore};
use crate::db::{RepositoryError, conflict_on_unique};

const RESIDENCE_COLUMNS: &str =
    "id, name, code, street, city, state, country, kind, creator_id, created_at, updated_at";

const DUPLICATE_CODE: &str = "residence code already exists";

#[derive(Debug, sqlx::FromRow)]
struct ResidenceRow {
    id: ResidenceId,
    name: String,
    code: String,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    kind: Option<String>,
    creator_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ResidenceRow> for Residence {
    fn from(row: ResidenceRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            code: row.code,
            street: row.street,
            city: row.city,
            state: row.state,
            country: row.country,
            kind: row.kind,
            creator_id: row.creator_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ResidenceFilter) {
    if let Some(term) = search_term(filter.search.as_deref()) {
        let pattern = like_pattern(term);
        qb.push(" AND (");
        for (i, column) in ["name", "code", "street", "city", "state"].into_iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(column).push(" ILIKE ").push_bind(pattern.clone());
        }
        qb.push(")");
    }
    if let Some(kind) = &filter.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
    for (column, value) in [
        ("city", &filter.city),
        ("state", &filter.state),
        ("country", &filter.country),
    ] {
        if let Some(term) = search_term(value.as_deref()) {
            qb.push(" AND ")
                .push(column)
                .push(" ILIKE ")
                .push_bind(like_pattern(term));
        }
    }
}

#[async_trait]
impl ResidenceStore for PgStore {
    async fn create_residence(
        &self,
        residence: NewResidence,
    ) -> Result<Residence, RepositoryError> {
        let row = sqlx::query_as::<_, ResidenceRow>(&format!(
            "INSERT INTO residences (id, name, code, street, city, state, country, kind, creator_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {RESIDENCE_COLUMNS}"
        ))
        .bind(ResidenceId::generate())
        .bind(&residence.name)
        .bind(&residence.code)
        .bind(&residence.street)
        .bind(&residence.city)
        .bind(&residence.state)
        .bind(&residence.country)
        .bind(&residence.kind)
        .bind(residence.creator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_CODE))?;

        Ok(row.into())
    }

    async fn get_residence(&self, id: ResidenceId) -> Result<Option<Residence>, RepositoryError> {
        let row = sqlx::query_as::<_, ResidenceRow>(&format!(
            "SELECT {RESIDENCE_COLUMNS} FROM residences WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn get_residence_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Residence>, RepositoryError> {
        let row = sqlx::query_as::<_, ResidenceRow>(&format!(
            "SELECT {RESIDENCE_COLUMNS} FROM residences WHERE code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_residences(
        &self,
        filter: &ResidenceFilter,
        page: PageRequest,
    ) -> Result<Paginated<Residence>, RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM residences WHERE TRUE");
        push_filters(&mut count, filter);
        let total = fetch_count(count, &self.pool).await?;

        let mut select = QueryBuilder::new(format!(
            "SELECT {RESIDENCE_COLUMNS} FROM residences WHERE TRUE"
        ));
        push_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC");
        push_page(&mut select, page);
        let rows: Vec<ResidenceRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Paginated::new(
            page,
            total,
            rows.into_iter().map(Into::into).collect(),
        ))
    }

    async fn update_residence(
        &self,
        id: ResidenceId,
        changes: ResidenceChanges,
    ) -> Result<Residence, RepositoryError> {
        let row = sqlx::query_as::<_, ResidenceRow>(&format!(
            "UPDATE residences SET
                name = COALESCE($2, name),
                code = COALESCE($3, code),
                street = COALESCE($4, street),
                city = COALESCE($5, city),
                state = COALESCE($6, state),
                country = COALESCE($7, country),
                kind = COALESCE($8, kind),
                updated_at = now()
             WHERE id = $1
             RETURNING {RESIDENCE_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.code)
        .bind(&changes.street)
        .bind(&changes.city)
        .bind(&changes.state)
        .bind(&changes.country)
        .bind(&changes.kind)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_on_unique(DUPLICATE_CODE))?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_residence(&self, id: ResidenceId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM residences WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn creators_of(
        &self,
        residences: &BTreeSet<ResidenceId>,
    ) -> Result<Vec<UserId>, RepositoryError> {
        if residences.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ResidenceId> = residences.iter().copied().collect();
        let creators = sqlx::query_scalar::<_, UserId>(
            "SELECT DISTINCT creator_id FROM residences WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(creators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_filters_match_partially_and_kind_exactly() {
        let filter = ResidenceFilter {
            kind: Some("apartment".to_owned()),
            city: Some("lisb".to_owned()),
            country: Some("  ".to_owned()),
            ..ResidenceFilter::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM residences WHERE TRUE");
        push_filters(&mut qb, &filter);

        assert_eq!(
            qb.sql(),
            "SELECT * FROM residences WHERE TRUE AND kind = $1 AND city ILIKE $2"
        );
    }
}
