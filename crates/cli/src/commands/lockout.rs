//! Lockout inspection commands.
//!
//! Operates on the persisted `lockout` table. A running API server keeps
//! its own in-memory copy, so a cleared lock is lifted there only on
//! restart.
//!
//! # Usage
//!
//! ```bash
//! souk-cli lockout list
//! souk-cli lockout clear username owner
//! souk-cli lockout prune
//! ```

use chrono::Utc;
use thiserror::Error;

use souk_api::db::{LockoutRepository, RepositoryError};
use souk_core::lockout::{LockKind, LockParseError, LockSubject};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum LockoutError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid lock kind (expected username or client_ip): {0}")]
    InvalidKind(#[from] LockParseError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Print the locks still in force.
pub async fn list() -> Result<(), LockoutError> {
    let pool = connect().await?;
    let locks = LockoutRepository::new(&pool).active(Utc::now()).await?;

    if locks.is_empty() {
        tracing::info!("No active lockouts");
        return Ok(());
    }

    for lock in &locks {
        tracing::info!(
            "{} locked until {} ({})",
            lock.subject,
            lock.locked_until,
            lock.reason.describe()
        );
    }
    tracing::info!("{} active lockout(s)", locks.len());
    Ok(())
}

/// Lift the lock on `key`.
pub async fn clear(kind: &str, key: &str) -> Result<(), LockoutError> {
    let kind: LockKind = kind.parse()?;
    let subject = match kind {
        LockKind::Username => LockSubject::username(key),
        LockKind::ClientIp => LockSubject::client_ip(key.trim()),
    };

    let pool = connect().await?;
    let removed = LockoutRepository::new(&pool).delete(&subject).await?;
    if removed {
        tracing::info!("{}", clear_report(&subject, removed));
    } else {
        tracing::warn!("{}", clear_report(&subject, removed));
    }
    Ok(())
}

/// Outcome line for `lockout clear`.
fn clear_report(subject: &LockSubject, removed: bool) -> String {
    if removed {
        format!(
            "Removed stored lock on {subject}; a running server keeps enforcing it until it restarts or the lock expires"
        )
    } else {
        format!("No lock stored for {subject}")
    }
}

/// Delete stored locks that have already run out.
pub async fn prune() -> Result<(), LockoutError> {
    let pool = connect().await?;
    let removed = LockoutRepository::new(&pool)
        .delete_expired(Utc::now())
        .await?;
    tracing::info!("Removed {removed} expired lockout(s)");
    Ok(())
}
