//! Security log inspection.
//!
//! # Usage
//!
//! ```bash
//! souk-cli security-log --limit 50
//! ```

use thiserror::Error;

use souk_api::db::{RepositoryError, SecurityLogRepository};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum SecurityLogError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Print the most recent security events, newest first.
pub async fn recent(limit: i64) -> Result<(), SecurityLogError> {
    let pool = connect().await?;
    let entries = SecurityLogRepository::new(&pool).recent(limit).await?;

    for entry in &entries {
        tracing::info!(
            "{} [{}] {}{}{}",
            entry.created_at,
            entry.source,
            entry.reason,
            entry
                .subject
                .as_deref()
                .map_or_else(String::new, |s| format!(" subject={s}")),
            entry
                .client_ip
                .as_deref()
                .map_or_else(String::new, |ip| format!(" ip={ip}")),
        );
    }
    tracing::info!("{} entries", entries.len());
    Ok(())
}
