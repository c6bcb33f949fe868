//! Signed bearer tokens (HS256 JWT).
//!
//! A token is `base64url(header).base64url(claims).base64url(signature)`
//! with no padding, signed with HMAC-SHA256 over the first two segments.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use souk_core::AdminUserId;

use crate::models::AdminUser;

/// Token lifetime.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

const HEADER_ALG: &str = "HS256";

/// Reasons a token is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid signing key")]
    Key,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    pub uid: AdminUserId,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies owner tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            ttl: Duration::seconds(TOKEN_TTL_SECS),
        }
    }

    /// Issue a token for `user` valid from `now` for one hour.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Key` if the secret cannot key the MAC.
    pub fn issue(&self, user: &AdminUser, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            sub: user.username.as_str().to_owned(),
            uid: user.id,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let expires_at = claims.expires_at();
        let header = Header {
            alg: HEADER_ALG.to_owned(),
            typ: "JWT".to_owned(),
        };

        let header = encode_segment(&header)?;
        let claims = encode_segment(&claims)?;
        let signing_input = format!("{header}.{claims}");
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&signing_input)?.finalize().into_bytes());

        Ok(IssuedToken {
            token: format!("{signing_input}.{signature}"),
            expires_at,
        })
    }

    /// Verify a token's signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns the `TokenError` describing why the token was rejected.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let parsed_header: Header = decode_segment(header)?;
        if parsed_header.alg != HEADER_ALG {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        self.mac(&format!("{header}.{claims}"))?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_segment(claims)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, signing_input: &str) -> Result<Hmac<Sha256>, TokenError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::Key)?;
        mac.update(signing_input.as_bytes());
        Ok(mac)
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|_| TokenError::Malformed)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use souk_core::Username;

    use super::*;

    fn service() -> TokenService {
        TokenService::new(SecretString::from("k8Jz!p2Qv#9Lm@4Rt&7Wx$1Yb^6Nc*3D"))
    }

    fn owner() -> AdminUser {
        AdminUser {
            id: AdminUserId::generate(),
            username: Username::parse("owner").unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let now = Utc::now();
        let user = owner();
        let issued = service().issue(&user, now).unwrap();

        assert_eq!(issued.token.split('.').count(), 3);
        assert!(!issued.token.contains('='));

        let claims = service().verify(&issued.token, now).unwrap();
        assert_eq!(claims.sub, "owner");
        assert_eq!(claims.uid, user.id);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
        assert_eq!(claims.expires_at(), issued.expires_at);
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now();
        let issued = service().issue(&owner(), now).unwrap();
        let later = now + Duration::seconds(TOKEN_TTL_SECS);
        assert_eq!(
            service().verify(&issued.token, later),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_tampered_token_rejected() {
        let now = Utc::now();
        let issued = service().issue(&owner(), now).unwrap();

        let mut parts: Vec<&str> = issued.token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&Claims {
                sub: "intruder".to_owned(),
                uid: AdminUserId::generate(),
                iat: now.timestamp(),
                exp: now.timestamp() + 10_000,
            })
            .unwrap(),
        );
        parts[1] = &forged_claims;
        assert_eq!(
            service().verify(&parts.join("."), now),
            Err(TokenError::BadSignature)
        );

        let other = TokenService::new(SecretString::from("another-signing-key-0123456789abcdef"));
        assert_eq!(
            other.verify(&issued.token, now),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_malformed_and_wrong_algorithm() {
        let now = Utc::now();
        assert_eq!(service().verify("abc", now), Err(TokenError::Malformed));
        assert_eq!(service().verify("a.b.c.d", now), Err(TokenError::Malformed));

        let none_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let token = format!("{none_header}.e30.");
        assert_eq!(
            service().verify(&token, now),
            Err(TokenError::UnsupportedAlgorithm)
        );
    }
}
