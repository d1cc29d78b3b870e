//! Command implementations.

pub mod ledger;
pub mod migrate;
pub mod seed;

use atelier_api::db::{self, RepositoryError, WithdrawalError};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

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

    /// A store operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The input broke a domain rule.
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Seed file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Seed file is not valid YAML for the expected shape.
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<WithdrawalError> for CommandError {
    fn from(e: WithdrawalError) -> Self {
        match e {
            WithdrawalError::Rejected(e) => Self::Invalid(e.to_string()),
            WithdrawalError::Repository(e) => Self::Repository(e),
        }
    }
}

/// Load `.env` and connect to the marketplace database.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("ATELIER_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("ATELIER_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}
