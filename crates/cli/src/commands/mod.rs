//! CLI subcommands.

pub mod migrate;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use residence_hub_server::db::{RepositoryError, create_pool};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),

    /// Invalid role.
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No user has the given email.
    #[error("No user with email: {0}")]
    UnknownUser(String),
}

/// Connect using `DATABASE_URL`, loading `.env` first.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(create_pool(&database_url).await?)
}
