//! Owner authentication route handlers.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::JsonBody;
use crate::error::{Result, set_sentry_user};
use crate::middleware::{ClientIp, RequireOwner};
use crate::models::AdminUser;
use crate::services::auth::IssuedToken;
use crate::state::AppState;

/// Body of `POST /api/register` and `POST /api/login`.
#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A signed-in owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub message: &'static str,
    pub token: String,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenResponse {
    fn new(message: &'static str, user: &AdminUser, issued: IssuedToken) -> Self {
        Self {
            message,
            token: issued.token,
            username: user.username.as_str().to_owned(),
            expires_at: issued.expires_at,
        }
    }
}

/// Whether registration is still open.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupStatus {
    pub signup_allowed: bool,
}

/// Result of checking a bearer token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Register the owner account. Only the first registration succeeds.
///
/// POST /api/register
#[instrument(skip(state), fields(username = %credentials.username))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let (user, issued) = state
        .auth()
        .register(&credentials.username, &credentials.password)
        .await?;
    set_sentry_user(&user.id, user.username.as_str());

    Ok((
        StatusCode::CREATED,
        Json(TokenResponse::new("Registration successful", &user, issued)),
    ))
}

/// Log in with username and password.
///
/// POST /api/login
#[instrument(skip(state), fields(username = %credentials.username))]
pub async fn login(
    State(state): State<AppState>,
    client_ip: ClientIp,
    JsonBody(credentials): JsonBody<Credentials>,
) -> Result<Json<TokenResponse>> {
    let ip = client_ip.key();
    let (user, issued) = state
        .auth()
        .login(&credentials.username, &credentials.password, ip.as_deref())
        .await?;
    set_sentry_user(&user.id, user.username.as_str());
    tracing::info!(user_id = %user.id, "Owner logged in");

    Ok(Json(TokenResponse::new("Login successful", &user, issued)))
}

/// GET /api/auth/check-signup
#[instrument(skip(state))]
pub async fn check_signup(State(state): State<AppState>) -> Result<Json<SignupStatus>> {
    let signup_allowed = state.auth().signup_allowed().await?;
    Ok(Json(SignupStatus { signup_allowed }))
}

/// Check the caller's bearer token.
///
/// GET /api/auth/verify
#[instrument(skip_all)]
pub async fn verify(RequireOwner(claims): RequireOwner) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        expires_at: claims.expires_at(),
        username: claims.sub,
    })
}
