//! Owner account.

use chrono::{DateTime, Utc};
use serde::Serialize;

use souk_core::{AdminUserId, Username};

/// The owner account. The password hash is only ever read by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: AdminUserId,
    pub username: Username,
    pub created_at: DateTime<Utc>,
}
