//! Persisted lockouts.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use souk_core::lockout::{LockKind, LockReason, LockSubject};

use super::RepositoryError;
use crate::models::LockoutRecord;

#[derive(Debug, sqlx::FromRow)]
struct LockoutRow {
    kind: String,
    key: String,
    locked_until: DateTime<Utc>,
    reason: String,
}

impl TryFrom<LockoutRow> for LockoutRecord {
    type Error = RepositoryError;

    fn try_from(row: LockoutRow) -> Result<Self, Self::Error> {
        let kind: LockKind = row
            .kind
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid lock kind: {e}")))?;
        let reason: LockReason = row
            .reason
            .parse()
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid lock reason: {e}")))?;

        Ok(Self {
            subject: LockSubject { kind, key: row.key },
            locked_until: row.locked_until,
            reason,
        })
    }
}

/// Repository for the `lockout` table.
pub struct LockoutRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LockoutRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a lock or push an existing one later.
    ///
    /// A stored expiry never moves backwards, so transitions saved out of
    /// order keep the latest lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn upsert(&self, record: &LockoutRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO souk.lockout AS stored (kind, key, locked_until, reason)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (kind, key)
            DO UPDATE SET locked_until = GREATEST(stored.locked_until, EXCLUDED.locked_until),
                          reason = CASE
                              WHEN EXCLUDED.locked_until >= stored.locked_until
                                  THEN EXCLUDED.reason
                              ELSE stored.reason
                          END,
                          updated_at = NOW()
            ",
        )
        .bind(record.subject.kind.as_str())
        .bind(&record.subject.key)
        .bind(record.locked_until)
        .bind(record.reason.as_str())
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Locks still in force at `now`, soonest expiry first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active(&self, now: DateTime<Utc>) -> Result<Vec<LockoutRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, LockoutRow>(
            r"
            SELECT kind, key, locked_until, reason
            FROM souk.lockout
            WHERE locked_until > $1
            ORDER BY locked_until
            ",
        )
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Remove a lock. Returns whether a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, subject: &LockSubject) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM souk.lockout WHERE kind = $1 AND key = $2")
            .bind(subject.kind.as_str())
            .bind(&subject.key)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove locks that expired before `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM souk.lockout WHERE locked_until <= $1")
            .bind(now)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
