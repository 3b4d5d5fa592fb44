//! Database migrations.
//!
//! Migrations are embedded from `crates/storefront/migrations/` at build
//! time, so the binary applies exactly the schema it was compiled against.

use super::{CommandError, connect};

/// Apply all pending storefront migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
