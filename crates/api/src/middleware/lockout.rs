//! Request-rate guard for `/api` routes.
//!
//! Counts every API request against the caller's IP. A locked IP gets 429
//! with `Retry-After` and the request never reaches a handler.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::client_ip::ClientIp;
use crate::error::AppError;
use crate::state::AppState;

/// Middleware enforcing the per-IP request-rate lock.
pub async fn lockout_guard(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Response {
    if let Some(ip) = ip
        && let Err(until) = state.lockout().check_request(&ip.to_string()).await
    {
        tracing::debug!(client_ip = %ip, %until, "Request refused while locked");
        return AppError::Locked { until }.into_response();
    }

    next.run(request).await
}
