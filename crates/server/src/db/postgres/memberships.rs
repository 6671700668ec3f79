use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use residence_hub_core::models::{Membership, MembershipDetail, UserSummary};
use residence_hub_core::{
    Email, JoinStatus, MembershipId, PageRequest, Paginated, ResidenceId, UserId,
};

use super::{PgStore, fetch_count, like_pattern, push_page, search_term};
use crate::db::store::{MembershipFilter, MembershipStore};
use crate::db::{RepositoryError, conflict_on_unique};

const MEMBERSHIP_COLUMNS: &str =
    "id, user_id, residence_id, join_status, version, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    id: MembershipId,
    user_id: UserId,
    residence_id: ResidenceId,
    join_status: JoinStatus,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            residence_id: row.residence_id,
            join_status: row.join_status,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A membership joined with its member.
#[derive(Debug, sqlx::FromRow)]
struct MembershipDetailRow {
    #[sqlx(flatten)]
    membership: MembershipRow,
    user_name: String,
    user_email: String,
}

impl TryFrom<MembershipDetailRow> for MembershipDetail {
    type Error = RepositoryError;

    fn try_from(row: MembershipDetailRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.user_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let user = UserSummary {
            id: row.membership.user_id,
            name: row.user_name,
            email,
        };

        Ok(Self {
            membership: row.membership.into(),
            user,
        })
    }
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a MembershipFilter) {
    qb.push(" AND m.residence_id = ")
        .push_bind(filter.residence_id)
        .push(" AND m.join_status = ")
        .push_bind(filter.status);
    if let Some(term) = search_term(filter.search.as_deref()) {
        let pattern = like_pattern(term);
        qb.push(" AND (u.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn create_membership(
        &self,
        user_id: UserId,
        residence_id: ResidenceId,
    ) -> Result<Membership, RepositoryError> {
        // Backed by the partial unique index on (user_id, residence_id)
        // WHERE join_status <> 'REJECTED'.
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "INSERT INTO memberships (id, user_id, residence_id, join_status)
             VALUES ($1, $2, $3, 'PENDING')
             RETURNING {MEMBERSHIP_COLUMNS}"
        ))
        .bind(MembershipId::generate())
        .bind(user_id)
        .bind(residence_id)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("an active membership already exists"))?;

        Ok(row.into())
    }

    async fn get_membership(
        &self,
        id: MembershipId,
    ) -> Result<Option<Membership>, RepositoryError> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_active_membership(
        &self,
        user_id: UserId,
        residence_id: ResidenceId,
    ) -> Result<Option<Membership>, RepositoryError> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships
             WHERE user_id = $1 AND residence_id = $2 AND join_status <> 'REJECTED'"
        ))
        .bind(user_id)
        .bind(residence_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_memberships(
        &self,
        filter: &MembershipFilter,
        page: PageRequest,
    ) -> Result<Paginated<MembershipDetail>, RepositoryError> {
        const FROM: &str = " FROM memberships m JOIN users u ON u.id = m.user_id WHERE TRUE";

        let mut count = QueryBuilder::new(format!("SELECT COUNT(*){FROM}"));
        push_filters(&mut count, filter);
        let total = fetch_count(count, &self.pool).await?;

        let mut select = QueryBuilder::new(format!(
            "SELECT m.id, m.user_id, m.residence_id, m.join_status, m.version,
                    m.created_at, m.updated_at,
                    u.name AS user_name, u.email AS user_email{FROM}"
        ));
        push_filters(&mut select, filter);
        select.push(" ORDER BY m.created_at DESC");
        push_page(&mut select, page);
        let rows: Vec<MembershipDetailRow> =
            select.build_query_as().fetch_all(&self.pool).await?;

        let data = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(page, total, data))
    }

    async fn update_join_status(
        &self,
        id: MembershipId,
        status: JoinStatus,
        expected_version: i32,
    ) -> Result<Membership, RepositoryError> {
        let row = sqlx::query_as::<_, MembershipRow>(&format!(
            "UPDATE memberships
             SET join_status = $2, version = version + 1, updated_at = now()
             WHERE id = $1 AND version = $3
             RETURNING {MEMBERSHIP_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        // Nothing matched: either the row is gone or its version moved on.
        match self.get_membership(id).await? {
            Some(_) => Err(RepositoryError::Conflict(
                "membership was modified concurrently".to_owned(),
            )),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn approved_residences_of(
        &self,
        user_id: UserId,
    ) -> Result<BTreeSet<ResidenceId>, RepositoryError> {
        let residences = sqlx::query_scalar::<_, ResidenceId>(
            "SELECT residence_id FROM memberships
             WHERE user_id = $1 AND join_status = 'APPROVED'",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(residences.into_iter().collect())
    }
}
