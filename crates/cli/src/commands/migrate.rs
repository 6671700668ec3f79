//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! rh-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Migrations live in `crates/server/migrations/` and are embedded at build
//! time.

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
