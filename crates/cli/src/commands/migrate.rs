//! Database migration command.
//!
//! Applies every pending migration from `crates/api/migrations/`. Migrations
//! are embedded at compile time, so the binary can run from any directory.

use super::{CliError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    pool.close().await;
    Ok(())
}
