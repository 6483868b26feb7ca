//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Server
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (required;
//!   falls back to `DATABASE_URL`)
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `ENABLE_PREORDER` - Preorder flag served when settings cannot be read
//!   (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Client
//! - `SAREINE_LOCAL_STORAGE_DIR` - Directory for the guest cart (default: `.sareine`)
//! - `SAREINE_SITE_SETTINGS_URL` - Settings endpoint
//!   (default: `http://127.0.0.1:3000/api/site-settings`)
//! - `SAREINE_SETTINGS_POLL_SECS` - Settings poll interval (default: 30)
//! - `ENABLE_PREORDER` - Preorder flag used until settings load (default: false)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_SETTINGS_URL: &str = "http://127.0.0.1:3000/api/site-settings";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Preorder flag served when the settings table cannot be read
    pub preorder_fallback: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            preorder_fallback: get_preorder_flag(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Shopper-side configuration for the cart engine and settings poller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Directory holding device-local storage
    pub local_storage_dir: PathBuf,
    /// Site settings endpoint
    pub site_settings_url: Url,
    /// How often site settings are re-fetched
    pub settings_poll_interval: Duration,
    /// Preorder flag used until settings load
    pub preorder_fallback: bool,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let site_settings_url = Url::parse(&get_env_or_default(
            "SAREINE_SITE_SETTINGS_URL",
            DEFAULT_SETTINGS_URL,
        ))
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SAREINE_SITE_SETTINGS_URL".to_string(), e.to_string())
        })?;
        let poll_secs = get_env_or_default("SAREINE_SETTINGS_POLL_SECS", "30")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "SAREINE_SETTINGS_POLL_SECS".to_string(),
                    "must be a positive number of seconds".to_string(),
                )
            })?;

        Ok(Self {
            local_storage_dir: PathBuf::from(get_env_or_default(
                "SAREINE_LOCAL_STORAGE_DIR",
                ".sareine",
            )),
            site_settings_url,
            settings_poll_interval: Duration::from_secs(poll_secs),
            preorder_fallback: get_preorder_flag(),
        })
    }

    /// Configuration polling `site_settings_url` with default interval and
    /// no preorder fallback.
    #[must_use]
    pub fn new(local_storage_dir: impl Into<PathBuf>, site_settings_url: Url) -> Self {
        Self {
            local_storage_dir: local_storage_dir.into(),
            site_settings_url,
            settings_poll_interval: Duration::from_secs(30),
            preorder_fallback: false,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// `ENABLE_PREORDER` is on only when set to exactly `true`.
fn get_preorder_flag() -> bool {
    parse_flag(get_optional_env("ENABLE_PREORDER").as_deref())
}

fn parse_flag(value: Option<&str>) -> bool {
    value == Some("true")
}
