//! Venue service configuration.
//!
//! Configuration is loaded from environment variables. The provider API key
//! is a `SecretString` and is redacted in Debug output.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:4001";

/// The provider's published signing keys, as a kid to X.509 PEM map.
pub const DEFAULT_IDP_KEYS_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

pub const DEFAULT_IDP_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";

pub const DEFAULT_IDP_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";

pub const DEFAULT_IDP_ISSUER_PREFIX: &str = "https://securetoken.google.com";

/// Default interval for the background key refresh (1 hour).
pub const DEFAULT_KEY_REFRESH_INTERVAL_SECONDS: u64 = 3600;

/// Default lifetime of the refresh token cookie.
pub const DEFAULT_REFRESH_COOKIE_TTL_DAYS: i64 = 30;

#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:4001").
    pub bind_address: String,

    /// Provider project id; the expected `aud` of every ID token.
    pub project_id: String,

    /// Provider web API key, sent as the `key` query parameter.
    pub api_key: SecretString,

    pub keys_url: String,

    /// Base URL for `accounts:*` calls.
    pub auth_url: String,

    /// Refresh-grant endpoint.
    pub token_url: String,

    /// Expected issuer is `{issuer_prefix}/{project_id}`.
    pub issuer_prefix: String,

    /// Tolerance for `iat` in the future, in seconds.
    pub jwt_clock_skew_seconds: u64,

    /// Background key refresh interval. `None` disables the task.
    pub key_refresh_interval: Option<Duration>,

    pub refresh_cookie_ttl_days: i64,

    /// Seconds to wait after a shutdown signal before draining.
    pub drain_seconds: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("project_id", &self.project_id)
            .field("api_key", &"[REDACTED]")
            .field("keys_url", &self.keys_url)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("issuer_prefix", &self.issuer_prefix)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("key_refresh_interval", &self.key_refresh_interval)
            .field("refresh_cookie_ttl_days", &self.refresh_cookie_ttl_days)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid key refresh interval: {0}")]
    InvalidKeyRefreshInterval(String),

    #[error("Invalid refresh cookie TTL: {0}")]
    InvalidRefreshCookieTtl(String),

    #[error("Invalid drain duration: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let project_id = required(vars, "IDP_PROJECT_ID")?;
        let api_key = SecretString::from(required(vars, "IDP_API_KEY")?);

        let bind_address = with_default(vars, "BIND_ADDRESS", DEFAULT_BIND_ADDRESS);
        let keys_url = with_default(vars, "IDP_KEYS_URL", DEFAULT_IDP_KEYS_URL);
        let auth_url = with_default(vars, "IDP_AUTH_URL", DEFAULT_IDP_AUTH_URL)
            .trim_end_matches('/')
            .to_string();
        let token_url = with_default(vars, "IDP_TOKEN_URL", DEFAULT_IDP_TOKEN_URL);
        let issuer_prefix = with_default(vars, "IDP_ISSUER_PREFIX", DEFAULT_IDP_ISSUER_PREFIX)
            .trim_end_matches('/')
            .to_string();

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let key_refresh_interval =
            if let Some(value_str) = vars.get("KEY_REFRESH_INTERVAL_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidKeyRefreshInterval(format!(
                        "KEY_REFRESH_INTERVAL_SECONDS must be a non-negative integer, got '{}': {}",
                        value_str, e
                    ))
                })?;
                // 0 disables the background refresh
                (value > 0).then(|| Duration::from_secs(value))
            } else {
                Some(Duration::from_secs(DEFAULT_KEY_REFRESH_INTERVAL_SECONDS))
            };

        let refresh_cookie_ttl_days = if let Some(value_str) = vars.get("REFRESH_COOKIE_TTL_DAYS")
        {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRefreshCookieTtl(format!(
                    "REFRESH_COOKIE_TTL_DAYS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidRefreshCookieTtl(format!(
                    "REFRESH_COOKIE_TTL_DAYS must be positive, got {}",
                    value
                )));
            }

            value
        } else {
            DEFAULT_REFRESH_COOKIE_TTL_DAYS
        };

        let drain_seconds = if let Some(value_str) = vars.get("DRAIN_SECONDS") {
            value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?
        } else {
            0
        };

        Ok(Config {
            bind_address,
            project_id,
            api_key,
            keys_url,
            auth_url,
            token_url,
            issuer_prefix,
            jwt_clock_skew_seconds,
            key_refresh_interval,
            refresh_cookie_ttl_days,
            drain_seconds,
        })
    }

    pub fn jwt_clock_skew(&self) -> Duration {
        Duration::from_secs(self.jwt_clock_skew_seconds)
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn with_default(vars: &HashMap<String, String>, name: &str, default: &str) -> String {
    vars.get(name)
        .cloned()
        .unwrap_or_else(|| default.to_string())
}
