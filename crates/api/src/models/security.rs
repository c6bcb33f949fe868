//! Security log entries and persisted lockouts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use souk_core::SecurityLogId;
use souk_core::lockout::{LockReason, LockSubject};

/// Who reported a security event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSource {
    /// Reported by a browser through `POST /api/security/log`.
    Client,
    /// Raised by the server itself, e.g. a lock transition.
    Server,
}

impl LogSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            other => Err(format!("unknown log source: {other}")),
        }
    }
}

/// A stored security event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityLog {
    pub id: SecurityLogId,
    pub reason: String,
    pub source: LogSource,
    pub subject: Option<String>,
    pub client_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A security event to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSecurityLog {
    pub reason: String,
    pub source: LogSource,
    pub subject: Option<String>,
    pub client_ip: Option<String>,
}

/// An active lock as stored in the `lockout` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockoutRecord {
    pub subject: LockSubject,
    pub locked_until: DateTime<Utc>,
    pub reason: LockReason,
}
