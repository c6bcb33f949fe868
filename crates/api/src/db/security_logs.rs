//! Security log repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use souk_core::SecurityLogId;

use super::RepositoryError;
use crate::models::{LogSource, NewSecurityLog, SecurityLog};

#[derive(Debug, sqlx::FromRow)]
struct SecurityLogRow {
    id: SecurityLogId,
    reason: String,
    source: String,
    subject: Option<String>,
    client_ip: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SecurityLogRow> for SecurityLog {
    type Error = RepositoryError;

    fn try_from(row: SecurityLogRow) -> Result<Self, Self::Error> {
        let source: LogSource = row
            .source
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: row.id,
            reason: row.reason,
            source,
            subject: row.subject,
            client_ip: row.client_ip,
            created_at: row.created_at,
        })
    }
}

/// Repository for the append-only security log.
pub struct SecurityLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SecurityLogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn append(&self, entry: &NewSecurityLog) -> Result<SecurityLog, RepositoryError> {
        let row = sqlx::query_as::<_, SecurityLogRow>(
            r"
            INSERT INTO souk.security_log (id, reason, source, subject, client_ip)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, reason, source, subject, client_ip, created_at
            ",
        )
        .bind(SecurityLogId::generate())
        .bind(&entry.reason)
        .bind(entry.source.as_str())
        .bind(&entry.subject)
        .bind(&entry.client_ip)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// The `limit` most recent entries.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent(&self, limit: i64) -> Result<Vec<SecurityLog>, RepositoryError> {
        let rows = sqlx::query_as::<_, SecurityLogRow>(
            r"
            SELECT id, reason, source, subject, client_ip, created_at
            FROM souk.security_log
            ORDER BY created_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
