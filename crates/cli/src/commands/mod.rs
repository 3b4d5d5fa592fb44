//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod staff;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use technova_storefront::services::auth::AuthError;

/// Errors from any subcommand.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] technova_storefront::db::RepositoryError),

    #[error(transparent)]
    Account(#[from] AuthError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] technova_core::EmailError),

    /// The username belongs to an account with a different email.
    #[error("Username already taken: {0}")]
    UsernameTaken(String),
}

/// Connect to the storefront database named by the environment.
///
/// # Errors
///
/// Returns `MissingEnvVar` when neither variable is set and `Database` when
/// the connection fails.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(technova_storefront::db::create_pool(&database_url).await?)
}
