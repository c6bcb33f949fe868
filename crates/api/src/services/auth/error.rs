//! Authentication error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use souk_core::UsernameError;

use super::token::TokenError;
use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid username format.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// Wrong password or unknown user.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An owner account already exists.
    #[error("registration is disabled")]
    RegistrationDisabled,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The username is locked after repeated failures.
    #[error("login locked until {until}")]
    Locked { until: DateTime<Utc> },

    /// Bearer token rejected.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
