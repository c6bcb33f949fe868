//! Server-side lockout enforcement.
//!
//! Wraps the in-memory [`LockoutRegistry`] and mirrors every lock
//! transition to the `lockout` table and the security log before the
//! refused request is answered. A failed write is logged; the in-memory lock
//! still holds.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::sync::Mutex;

use souk_core::lockout::{Gate, LockTransition, LockoutPolicy, LockoutRegistry};

use crate::db::{LockoutRepository, RepositoryError, SecurityLogRepository};
use crate::models::{LockoutRecord, LogSource, NewSecurityLog};

/// Lockout state shared by all requests.
pub struct LockoutService {
    registry: Mutex<LockoutRegistry>,
    pool: PgPool,
}

impl LockoutService {
    #[must_use]
    pub fn new(pool: PgPool, policy: LockoutPolicy) -> Self {
        Self {
            registry: Mutex::new(LockoutRegistry::new(policy)),
            pool,
        }
    }

    /// Reload locks persisted by a previous run. Returns how many are active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the locks cannot be read.
    pub async fn restore(&self) -> Result<usize, RepositoryError> {
        let now = Utc::now();
        let records = LockoutRepository::new(&self.pool).active(now).await?;
        let count = records.len();

        let mut registry = self.registry.lock().await;
        for record in records {
            registry.restore(record.subject, record.locked_until, record.reason, now);
        }
        Ok(count)
    }

    /// Count a request from `ip`.
    ///
    /// # Errors
    ///
    /// Returns the lock expiry if the IP is locked.
    pub async fn check_request(&self, ip: &str) -> Result<(), DateTime<Utc>> {
        let gate = self.registry.lock().await.record_request(ip, Utc::now());
        self.settle(gate, Some(ip)).await
    }

    /// Check a login attempt before the password is verified.
    ///
    /// # Errors
    ///
    /// Returns the lock expiry if the username is locked. The attempt extends
    /// the lock.
    pub async fn gate_login(&self, username: &str, ip: Option<&str>) -> Result<(), DateTime<Utc>> {
        let gate = self.registry.lock().await.gate_login(username, Utc::now());
        self.settle(gate, ip).await
    }

    /// Record a failed login; may lock the username.
    pub async fn login_failed(&self, username: &str, ip: Option<&str>) {
        let transition = self
            .registry
            .lock()
            .await
            .record_login_failure(username, Utc::now());
        if let Some(transition) = transition {
            self.persist(&transition, ip).await;
        }
    }

    pub async fn login_succeeded(&self, username: &str) {
        self.registry.lock().await.record_login_success(username);
    }

    /// Locks in force right now.
    pub async fn active(&self) -> Vec<LockoutRecord> {
        self.registry
            .lock()
            .await
            .active(Utc::now())
            .into_iter()
            .map(|(subject, locked_until, reason)| LockoutRecord {
                subject,
                locked_until,
                reason,
            })
            .collect()
    }

    async fn settle(&self, gate: Gate, ip: Option<&str>) -> Result<(), DateTime<Utc>> {
        match gate {
            Gate::Open => Ok(()),
            Gate::Locked { until, transition } => {
                if let Some(transition) = transition {
                    self.persist(&transition, ip).await;
                }
                Err(until)
            }
        }
    }

    async fn persist(&self, transition: &LockTransition, ip: Option<&str>) {
        tracing::warn!(
            subject = %transition.subject(),
            until = %transition.until(),
            "{}",
            transition.describe()
        );

        if let Err(e) = persist_transition(&self.pool, transition, ip).await {
            tracing::error!(error = %e, "Failed to persist lock transition");
        }
    }
}

async fn persist_transition(
    pool: &PgPool,
    transition: &LockTransition,
    client_ip: Option<&str>,
) -> Result<(), RepositoryError> {
    let subject = transition.subject();
    LockoutRepository::new(pool)
        .upsert(&LockoutRecord {
            subject: subject.clone(),
            locked_until: transition.until(),
            reason: transition.reason(),
        })
        .await?;

    SecurityLogRepository::new(pool)
        .append(&NewSecurityLog {
            reason: transition.describe(),
            source: LogSource::Server,
            subject: Some(subject.to_string()),
            client_ip: client_ip.map(str::to_owned),
        })
        .await?;
    Ok(())
}
