//! Persistence for Residence Hub.
//!
//! Services talk to the store through the traits in [`store`]. Two adapters
//! implement them:
//!
//! - [`postgres::PgStore`] - `PostgreSQL` via `sqlx`
//! - [`memory::InMemoryStore`] - tables behind a `tokio` lock, for tests
//!
//! ## Tables
//!
//! - `users` - Accounts and their role
//! - `residences` - Properties, unique `code`
//! - `memberships` - User x residence join status with an optimistic `version`
//! - `news` - Posts scoped to one residence
//! - `issue_types` - Categories reports are filed under
//! - `issue_reports` - Maintenance reports scoped to one residence
//! - `appointments` - Meetings between an owner and a concerned user
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p residence-hub-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;
pub mod store;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use store::{
    AppointmentStore, DynStore, IssueReportStore, IssueTypeStore, MembershipStore, NewsStore,
    ResidenceStore, Store, StoreHealth, UserStore,
};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique residence code) or a stale version.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError {
    move |e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict(message.to_owned());
        }
        RepositoryError::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
