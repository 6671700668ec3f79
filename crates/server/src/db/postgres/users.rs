use async_trait::async_trait;
use chrono::{DateTime, Utc};

use residence_hub_core::models::User;
use residence_hub_core::{Email, Role, UserId};

use super::PgStore;
use crate::db::store::{NewUser, UserStore};
use crate::db::{RepositoryError, conflict_on_unique};

const USER_COLUMNS: &str = "id, name, email, role, is_verified, created_at, updated_at";

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
pub(super) struct UserRow {
    id: UserId,
    name: String,
    email: String,
    role: Role,
    is_verified: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            role: row.role,
            is_verified: row.is_verified,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, name, email, role, is_verified)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(UserId::generate())
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(user.role)
        .bind(user.is_verified)
        .fetch_one(&self.pool)
        .await
        .map_err(conflict_on_unique("email already exists"))?;

        row.try_into()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2, updated_at = now()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }
}
