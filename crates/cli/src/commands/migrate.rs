//! Database migration command.
//!
//! Migrations live in `crates/api/migrations/` and are embedded at build
//! time. The API server never runs them itself.

use super::{CommandError, connect};

/// Apply any pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
