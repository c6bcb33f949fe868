//! Owner account commands.
//!
//! # Usage
//!
//! ```bash
//! # Password from the environment
//! SOUK_ADMIN_PASSWORD='...' souk-cli admin create --username owner
//!
//! # Password from stdin
//! printf '%s\n' "$PASSWORD" | souk-cli admin create --username owner
//! ```
//!
//! The shop has a single owner. Creation fails once an account exists; this
//! is the same rule the `/api/register` endpoint enforces.

use std::io::BufRead;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use souk_api::db::{AdminUserRepository, RepositoryError};
use souk_api::services::auth::{AuthError, hash_password, validate_password};
use souk_core::{Username, UsernameError};

use super::{ConnectError, connect};

/// Errors that can occur during owner account operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("No password given: set SOUK_ADMIN_PASSWORD or pipe it on stdin")]
    MissingPassword,

    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Password(#[from] AuthError),

    #[error("An owner account already exists")]
    OwnerExists,

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// `SOUK_ADMIN_PASSWORD`, or the first line of stdin.
fn read_password() -> Result<SecretString, AdminError> {
    if let Ok(password) = std::env::var("SOUK_ADMIN_PASSWORD") {
        return Ok(SecretString::from(password));
    }

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(AdminError::MissingPassword);
    }
    Ok(SecretString::from(password))
}

/// Create the owner account.
pub async fn create_owner(username: &str) -> Result<(), AdminError> {
    let username = Username::parse(username)?;
    let password = read_password()?;
    validate_password(password.expose_secret())?;

    let pool = connect().await?;
    let users = AdminUserRepository::new(&pool);

    if users.any_exists().await? {
        return Err(AdminError::OwnerExists);
    }

    let hash = hash_password(password.expose_secret())?;
    let owner = match users.create(&username, &hash).await {
        Ok(owner) => owner,
        Err(RepositoryError::Conflict(_)) => return Err(AdminError::OwnerExists),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Owner account created! ID: {}, Username: {}",
        owner.id,
        owner.username
    );
    Ok(())
}
