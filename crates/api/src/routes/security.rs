//! Client-reported security events.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use super::{JsonBody, MessageResponse};
use crate::db::SecurityLogRepository;
use crate::error::{AppError, Result};
use crate::middleware::ClientIp;
use crate::models::{LogSource, NewSecurityLog};
use crate::state::AppState;

const MAX_REASON_LEN: usize = 1000;

/// Body of `POST /api/security/log`.
#[derive(Debug, Deserialize)]
pub struct SecurityReport {
    #[serde(default)]
    pub reason: String,
}

/// Append a client-reported event to the security log.
///
/// POST /api/security/log
#[instrument(skip(state, report))]
pub async fn log(
    State(state): State<AppState>,
    client_ip: ClientIp,
    JsonBody(report): JsonBody<SecurityReport>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let reason = report.reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("Reason is required".to_string()));
    }
    let reason: String = reason.chars().take(MAX_REASON_LEN).collect();

    let entry = SecurityLogRepository::new(state.pool())
        .append(&NewSecurityLog {
            reason,
            source: LogSource::Client,
            subject: None,
            client_ip: client_ip.key(),
        })
        .await?;
    tracing::warn!(log_id = %entry.id, reason = %entry.reason, "Client reported suspicious activity");

    Ok((StatusCode::CREATED, Json(MessageResponse::new("Security event logged"))))
}
