//! `PostgreSQL` adapter.
//!
//! Queries are built at runtime with `sqlx::query_as` and `QueryBuilder`,
//! decoded into internal row types, then converted into core models.

mod appointments;
mod issue_reports;
mod issue_types;
mod memberships;
mod news;
mod residences;
mod users;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use residence_hub_core::PageRequest;
use residence_hub_core::access::ScopePredicate;

use super::RepositoryError;
use super::store::StoreHealth;

/// Store backed by a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// Query helpers
// =============================================================================

/// Columns a [`ScopePredicate`] is evaluated against.
struct ScopeColumns {
    residence: &'static str,
    owner: &'static str,
    concerned: Option<&'static str>,
}

/// Append ` AND <predicate>` for `scope`.
fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopePredicate, columns: &ScopeColumns) {
    match scope {
        ScopePredicate::Unrestricted => {}
        ScopePredicate::Residences(residences) => {
            qb.push(" AND ")
                .push(columns.residence)
                .push(" = ANY(")
                .push_bind(residences.iter().copied().collect::<Vec<_>>())
                .push(")");
        }
        ScopePredicate::Party(user) => {
            qb.push(" AND (").push(columns.owner).push(" = ").push_bind(*user);
            if let Some(concerned) = columns.concerned {
                qb.push(" OR ").push(concerned).push(" = ").push_bind(*user);
            }
            qb.push(")");
        }
        ScopePredicate::Nothing => {
            qb.push(" AND FALSE");
        }
    }
}

/// Append `LIMIT` and `OFFSET` for `page`.
fn push_page(qb: &mut QueryBuilder<'_, Postgres>, page: PageRequest) {
    qb.push(" LIMIT ")
        .push_bind(i64::try_from(page.take()).unwrap_or(i64::MAX))
        .push(" OFFSET ")
        .push_bind(i64::try_from(page.skip()).unwrap_or(i64::MAX));
}

/// Run a `SELECT COUNT(*)` query built by `qb`.
async fn fetch_count(
    mut qb: QueryBuilder<'_, Postgres>,
    pool: &PgPool,
) -> Result<u64, RepositoryError> {
    let total: i64 = qb.build_query_scalar().fetch_one(pool).await?;
    Ok(u64::try_from(total).unwrap_or_default())
}

/// `%needle%` with LIKE metacharacters escaped.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Returns the trimmed search term, or `None` if blank.
fn search_term(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use residence_hub_core::{ResidenceId, UserId};

    use super::*;

    const COLUMNS: ScopeColumns = ScopeColumns {
        residence: "residence_id",
        owner: "owner_id",
        concerned: Some("concerned_id"),
    };

    fn sql_for(scope: &ScopePredicate) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM t WHERE TRUE");
        push_scope(&mut qb, scope, &COLUMNS);
        qb.sql().to_owned()
    }

    #[test]
    fn test_nothing_scope_matches_no_rows() {
        assert_eq!(
            sql_for(&ScopePredicate::Nothing),
            "SELECT * FROM t WHERE TRUE AND FALSE"
        );
    }

    #[test]
    fn test_unrestricted_scope_adds_nothing() {
        assert_eq!(
            sql_for(&ScopePredicate::Unrestricted),
            "SELECT * FROM t WHERE TRUE"
        );
    }

    #[test]
    fn test_residence_scope_uses_any() {
        let scope = ScopePredicate::Residences(BTreeSet::from([ResidenceId::generate()]));
        assert_eq!(
            sql_for(&scope),
            "SELECT * FROM t WHERE TRUE AND residence_id = ANY($1)"
        );
    }

    #[test]
    fn test_party_scope() {
        let scope = ScopePredicate::Party(UserId::generate());
        assert_eq!(
            sql_for(&scope),
            "SELECT * FROM t WHERE TRUE AND (owner_id = $1 OR concerned_id = $2)"
        );
    }

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }
}
