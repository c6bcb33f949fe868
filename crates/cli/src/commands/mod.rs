//! Subcommand implementations.

pub mod admin;
pub mod lockout;
pub mod migrate;
pub mod security;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

/// Failure to reach the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// `SOUK_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, ConnectError> {
    std::env::var("SOUK_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingEnvVar("SOUK_DATABASE_URL"))
}

/// Connect to the shop database.
pub async fn connect() -> Result<PgPool, ConnectError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(PgPool::connect(url.expose_secret()).await?)
}
