//! Authentication service.
//!
//! Owner registration, password login and bearer token verification.

mod error;
pub mod token;

pub use error::AuthError;
pub use token::{Claims, IssuedToken, TokenError, TokenService};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use sqlx::PgPool;

use souk_core::Username;

use crate::db::{AdminUserRepository, RepositoryError};
use crate::models::AdminUser;
use crate::services::lockout::LockoutService;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Verified against when the username is unknown so both failure paths do
/// the same work.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Authentication service.
pub struct AuthService<'a> {
    users: AdminUserRepository<'a>,
    tokens: &'a TokenService,
    lockout: &'a LockoutService,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        tokens: &'a TokenService,
        lockout: &'a LockoutService,
    ) -> Self {
        Self {
            users: AdminUserRepository::new(pool),
            tokens,
            lockout,
        }
    }

    /// Whether registration is still open (no owner account yet).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the check fails.
    pub async fn signup_allowed(&self) -> Result<bool, AuthError> {
        Ok(!self.users.any_exists().await?)
    }

    /// Register the owner account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RegistrationDisabled` once an account exists,
    /// whatever the payload. Returns `InvalidUsername` / `WeakPassword` for
    /// bad input.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(AdminUser, IssuedToken), AuthError> {
        if self.users.any_exists().await? {
            return Err(AuthError::RegistrationDisabled);
        }

        let username = Username::parse(username)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&username, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::RegistrationDisabled,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "Owner account registered");
        let token = self.tokens.issue(&user, Utc::now())?;
        Ok((user, token))
    }

    /// Log in with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Locked` while the username is locked and
    /// `AuthError::InvalidCredentials` for an unknown user or wrong password.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client_ip: Option<&str>,
    ) -> Result<(AdminUser, IssuedToken), AuthError> {
        self.lockout
            .gate_login(username, client_ip)
            .await
            .map_err(|until| AuthError::Locked { until })?;

        let found = self.users.get_with_password_hash(username).await?;
        let verified = match &found {
            Some((_, hash)) => verify_password(password, hash).is_ok(),
            None => {
                let _ = verify_password(password, DUMMY_HASH);
                false
            }
        };

        match found {
            Some((user, _)) if verified => {
                self.lockout.login_succeeded(username).await;
                let token = self.tokens.issue(&user, Utc::now())?;
                Ok((user, token))
            }
            _ => {
                tracing::info!("Failed login attempt");
                self.lockout.login_failed(username, client_ip).await;
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Verify a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if the token is malformed, forged or expired.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(self.tokens.verify(token, Utc::now())?)
    }
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` for passwords under eight characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
