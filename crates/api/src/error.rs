//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Every error body is JSON with at least a `message` field.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    extract::multipart::MultipartError,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::db::{CheckoutError, RepositoryError};
use crate::services::assets::AssetError;
use crate::services::auth::{AuthError, TokenError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Asset host operation failed.
    #[error("Asset host error: {0}")]
    Asset(#[from] AssetError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Missing or rejected credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Upload larger than the configured cap.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Checkout referenced sold-out products (titles).
    #[error("Some products are sold out")]
    SoldOut(Vec<String>),

    /// The username or client IP is locked.
    #[error("Too many attempts, locked until {until}")]
    Locked { until: DateTime<Utc> },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidUsername(e) => Self::BadRequest(e.to_string()),
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid credentials".to_string()),
            AuthError::RegistrationDisabled => {
                Self::Forbidden("Registration is disabled".to_string())
            }
            AuthError::WeakPassword(msg) => Self::BadRequest(msg),
            AuthError::Locked { until } => Self::Locked { until },
            AuthError::Token(TokenError::Key) => Self::Internal("token signing key".to_string()),
            AuthError::Token(e) => Self::Unauthorized(token_message(&e).to_string()),
            AuthError::Repository(e) => Self::Database(e),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_string()),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Invalid(e) => Self::BadRequest(e.to_string()),
            CheckoutError::UnknownProducts(ids) => Self::BadRequest(format!(
                "Unknown products: {}",
                ids.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            CheckoutError::SoldOut(titles) => Self::SoldOut(titles),
            CheckoutError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge("Image is too large".to_string())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

/// Client-facing message for a rejected bearer token.
#[must_use]
pub const fn token_message(err: &TokenError) -> &'static str {
    match err {
        TokenError::Malformed | TokenError::UnsupportedAlgorithm => "Malformed token",
        TokenError::BadSignature => "Invalid token",
        TokenError::Expired => "Token expired",
        TokenError::Key => "Internal server error",
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Asset(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) | Self::SoldOut(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Locked { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    // Don't expose internal error details to clients
    fn message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(what)) => format!("{what} already exists"),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Asset(_) => "External service error".to_string(),
            _ => self.to_string(),
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
            ) | Self::Internal(_)
                | Self::Asset(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let message = self.message();

        match self {
            Self::SoldOut(titles) => (
                status,
                Json(json!({
                    "message": format!("Cannot place order: sold out: {}", titles.join(", ")),
                    "soldOutProducts": titles,
                })),
            )
                .into_response(),
            Self::Locked { until } => {
                let mut response = (
                    status,
                    Json(json!({
                        "message": message,
                        "lockedUntil": until,
                    })),
                )
                    .into_response();
                if let Ok(value) = HeaderValue::from_str(&retry_after_secs(until, Utc::now()).to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            _ => (status, Json(json!({ "message": message }))).into_response(),
        }
    }
}

/// Whole seconds until `until`, rounded up and never below one.
#[must_use]
pub fn retry_after_secs(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (until - now).num_milliseconds();
    ((millis + 999) / 1000).max(1)
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after a successful login.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use chrono::Duration;
    use serde_json::Value;

    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("Product not found".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::SoldOut(vec!["Mug".to_string()])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Asset(AssetError::Parse("bad".to_string()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_sold_out_body_lists_titles() {
        let response =
            AppError::SoldOut(vec!["Red Mug".to_string(), "Tea Set".to_string()]).into_response();
        let body = body_json(response).await;
        assert_eq!(body["soldOutProducts"], serde_json::json!(["Red Mug", "Tea Set"]));
        assert!(body["message"].as_str().unwrap().contains("Red Mug"));
    }

    #[tokio::test]
    async fn test_locked_sets_retry_after() {
        let until = Utc::now() + Duration::seconds(120);
        let response = AppError::Locked { until }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry: i64 = response
            .headers()
            .get(header::RETRY_AFTER)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((119..=120).contains(&retry));

        let body = body_json(response).await;
        assert!(body["lockedUntil"].is_string());
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let response = AppError::Internal("connection refused at 10.0.0.3".to_string()).into_response();
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn test_auth_errors_map_to_statuses() {
        let status = |e: AuthError| AppError::from(e).status();
        assert_eq!(status(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AuthError::RegistrationDisabled), StatusCode::FORBIDDEN);
        assert_eq!(
            status(AuthError::WeakPassword("short".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(AuthError::Token(TokenError::Expired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AuthError::Locked { until: Utc::now() }),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_token_messages_are_distinct() {
        assert_ne!(
            token_message(&TokenError::Expired),
            token_message(&TokenError::BadSignature)
        );
        assert_ne!(
            token_message(&TokenError::Malformed),
            token_message(&TokenError::BadSignature)
        );
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let now = Utc::now();
        assert_eq!(retry_after_secs(now + Duration::milliseconds(1500), now), 2);
        assert_eq!(retry_after_secs(now - Duration::seconds(5), now), 1);
    }
}
