//! Bearer token extractor for owner-only routes.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;

use crate::error::{AppError, token_message};
use crate::services::auth::{Claims, TokenError};
use crate::state::AppState;

/// Extractor that requires a valid owner bearer token.
///
/// Missing header yields 401 "Authentication required"; a malformed, forged
/// or expired token yields 401 with a message naming which.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireOwner(claims): RequireOwner) -> String {
///     format!("Hello, {}!", claims.sub)
/// }
/// ```
pub struct RequireOwner(pub Claims);

/// Pull the token out of an `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` if the header is absent or not a bearer
/// credential.
pub fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    value
        .to_str()
        .ok()
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized(token_message(&TokenError::Malformed).to_string()))
}

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.tokens().verify(token, Utc::now()).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            match e {
                TokenError::Key => AppError::Internal(e.to_string()),
                other => AppError::Unauthorized(token_message(&other).to_string()),
            }
        })?;

        tracing::Span::current().record("owner", claims.sub.as_str());
        Ok(Self(claims))
    }
}
