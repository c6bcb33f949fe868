//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SOUK_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `SOUK_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `CLOUDINARY_CLOUD_NAME` - Cloudinary cloud name
//! - `CLOUDINARY_API_KEY` - Cloudinary API key
//! - `CLOUDINARY_API_SECRET` - Cloudinary API secret
//!
//! ## Optional
//! - `SOUK_HOST` - Bind address (default: 127.0.0.1)
//! - `SOUK_PORT` - Listen port (default: 3000)
//! - `SOUK_MAX_UPLOAD_BYTES` - Largest accepted product image (default: 5 MiB)
//! - `SOUK_STATIC_DIR` - Directory of front-end files served at `/`
//! - `SOUK_CORS_ORIGINS` - Comma-separated allowed origins (default: any)
//! - `SOUK_LOCKOUT_SECS` - Lock duration (default: 300)
//! - `SOUK_LOGIN_MAX_FAILURES` - Failed logins before a lock (default: 2)
//! - `SOUK_LOGIN_FAILURE_WINDOW_SECS` - Window for counting failures (default: 300)
//! - `SOUK_RATE_LIMIT_MAX_REQUESTS` - Requests allowed per window (default: 50)
//! - `SOUK_RATE_LIMIT_WINDOW_SECS` - Request-rate window (default: 10)
//! - `CLOUDINARY_FOLDER` - Upload folder (default: `ecommerce_products`)
//! - `CLOUDINARY_BASE_URL` - API base URL (default: `https://api.cloudinary.com`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use souk_core::lockout::LockoutPolicy;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Token signing secret
    pub jwt_secret: SecretString,
    pub cloudinary: CloudinaryConfig,
    pub max_upload_bytes: usize,
    /// Front-end files served at `/` when set
    pub static_dir: Option<PathBuf>,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
    pub lockout: LockoutPolicy,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Cloudinary upload API configuration.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
    /// Folder that uploads are stored under
    pub folder: String,
    pub base_url: Url,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SOUK_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("SOUK_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("SOUK_PORT", "3000")?;
        let jwt_secret = get_validated_secret("SOUK_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "SOUK_JWT_SECRET")?;

        let cloudinary = CloudinaryConfig::from_env()?;
        let max_upload_bytes = parse_env_or_default::<usize>(
            "SOUK_MAX_UPLOAD_BYTES",
            &DEFAULT_MAX_UPLOAD_BYTES.to_string(),
        )?;
        let static_dir = get_optional_env("SOUK_STATIC_DIR").map(PathBuf::from);
        let cors_origins = get_optional_env("SOUK_CORS_ORIGINS")
            .map(|v| parse_origin_list(&v))
            .unwrap_or_default();

        let lockout = lockout_policy_from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?;
        let sentry_traces_sample_rate =
            parse_env_or_default::<f32>("SENTRY_TRACES_SAMPLE_RATE", "0.0")?;

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            cloudinary,
            max_upload_bytes,
            static_dir,
            cors_origins,
            lockout,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_env_or_default("CLOUDINARY_BASE_URL", "https://api.cloudinary.com");
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CLOUDINARY_BASE_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_required_secret("CLOUDINARY_API_SECRET")?,
            folder: get_env_or_default("CLOUDINARY_FOLDER", "ecommerce_products"),
            base_url,
        })
    }
}

fn lockout_policy_from_env() -> Result<LockoutPolicy, ConfigError> {
    let defaults = LockoutPolicy::default();
    Ok(LockoutPolicy {
        lock_duration: seconds_env("SOUK_LOCKOUT_SECS", defaults.lock_duration)?,
        login_max_failures: parse_env_or_default(
            "SOUK_LOGIN_MAX_FAILURES",
            &defaults.login_max_failures.to_string(),
        )?,
        login_failure_window: seconds_env(
            "SOUK_LOGIN_FAILURE_WINDOW_SECS",
            defaults.login_failure_window,
        )?,
        rate_max_requests: parse_env_or_default(
            "SOUK_RATE_LIMIT_MAX_REQUESTS",
            &defaults.rate_max_requests.to_string(),
        )?,
        rate_window: seconds_env("SOUK_RATE_LIMIT_WINDOW_SECS", defaults.rate_window)?,
    })
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a whole number of seconds. Zero is rejected.
fn seconds_env(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    let secs: i64 = parse_env_or_default(key, &default.num_seconds().to_string())?;
    if secs <= 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be a positive number of seconds".to_string(),
        ));
    }
    Ok(Duration::seconds(secs))
}

fn parse_origin_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

/// Validate that the token secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cloudinary() -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo-cloud".to_string(),
            api_key: "123456789012345".to_string(),
            api_secret: SecretString::from("cloudinary_api_secret_value"),
            folder: "ecommerce_products".to_string(),
            base_url: Url::parse("https://api.cloudinary.com").unwrap(),
        }
    }

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let err = validate_secret_strength("your-jwt-key-here", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"a".repeat(40), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_jwt_secret_length() {
        assert!(validate_jwt_secret(&SecretString::from("short"), "TEST_JWT").is_err());
        assert!(validate_jwt_secret(&SecretString::from("a".repeat(32)), "TEST_JWT").is_ok());
    }

    #[test]
    fn test_parse_origin_list() {
        assert_eq!(
            parse_origin_list(" https://shop.example.et/ ,, http://localhost:5173"),
            vec!["https://shop.example.et", "http://localhost:5173"]
        );
        assert!(parse_origin_list(" , ").is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            jwt_secret: SecretString::from("x".repeat(32)),
            cloudinary: cloudinary(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            static_dir: None,
            cors_origins: Vec::new(),
            lockout: LockoutPolicy::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_cloudinary_config_debug_redacts_secret() {
        let debug_output = format!("{:?}", cloudinary());
        assert!(debug_output.contains("demo-cloud"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("cloudinary_api_secret_value"));
    }
}
