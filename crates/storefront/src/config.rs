//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PHARMACART_API_URL` - Base URL of the backend REST API (e.g., `https://api.example.in`)
//!
//! ## Optional
//! - `PHARMACART_CART_PATH` - Guest cart file (default: .pharmacart/cart.json)
//! - `PHARMACART_REQUEST_TIMEOUT_SECS` - Timeout for foreground cart calls (default: 8)
//! - `PHARMACART_MIGRATION_TIMEOUT_SECS` - Timeout for each guest-cart merge call (default: 5)
//! - `PHARMACART_MIGRATION_POLICY` - `clear-all` or `retain-failed` (default: clear-all)
//! - `PHARMACART_WHATSAPP_NUMBER` - Shop number that receives order requests
//! - `PHARMACART_DELIVERY_FEE` - Flat delivery fee in rupees (default: 50)
//! - `PHARMACART_ACCESS_TOKEN` - Bearer token of a signed-in customer
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use pharmacart_core::{AccessToken, MobileNumber};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::sync::{MigrationPolicy, SyncConfig};

const DEFAULT_CART_PATH: &str = ".pharmacart/cart.json";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 8;
const DEFAULT_MIGRATION_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DELIVERY_FEE: i64 = 50;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API settings
    pub api: ApiConfig,
    /// Path of the guest cart file
    pub cart_path: PathBuf,
    /// Cart synchronizer tuning
    pub sync: SyncConfig,
    /// Checkout settings
    pub checkout: CheckoutConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Backend REST API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL (a trailing slash is added if missing so joins keep the path)
    pub base_url: Url,
    /// Client-level timeout applied to every HTTP request
    pub timeout: Duration,
    /// Bearer token of a signed-in customer, if one was provided
    pub access_token: Option<SecretString>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl ApiConfig {
    /// Create an API configuration for `base_url` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL cannot be parsed.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("PHARMACART_API_URL", base_url)?,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            access_token: None,
        })
    }

    /// The configured access token as a cart credential.
    #[must_use]
    pub fn access_token(&self) -> Option<AccessToken> {
        self.access_token.clone().map(AccessToken::from)
    }
}

/// Checkout message configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Shop WhatsApp number that receives order requests
    pub whatsapp_number: Option<MobileNumber>,
    /// Flat delivery fee charged on non-empty orders
    pub delivery_fee: Decimal,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            whatsapp_number: None,
            delivery_fee: Decimal::from(DEFAULT_DELIVERY_FEE),
        }
    }
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

        let request_timeout = get_secs_or_default(
            "PHARMACART_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        let migration_timeout = get_secs_or_default(
            "PHARMACART_MIGRATION_TIMEOUT_SECS",
            DEFAULT_MIGRATION_TIMEOUT_SECS,
        )?;
        let migration_policy = get_env_or_default("PHARMACART_MIGRATION_POLICY", "clear-all")
            .parse::<MigrationPolicy>()
            .map_err(|e| ConfigError::InvalidEnvVar("PHARMACART_MIGRATION_POLICY".to_string(), e))?;

        let api = ApiConfig {
            base_url: parse_base_url(
                "PHARMACART_API_URL",
                &get_required_env("PHARMACART_API_URL")?,
            )?,
            timeout: request_timeout,
            access_token: get_optional_env("PHARMACART_ACCESS_TOKEN").map(SecretString::from),
        };

        Ok(Self {
            api,
            cart_path: PathBuf::from(get_env_or_default("PHARMACART_CART_PATH", DEFAULT_CART_PATH)),
            sync: SyncConfig {
                request_timeout,
                migration_timeout,
                migration_policy,
            },
            checkout: CheckoutConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }
}

impl CheckoutConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let whatsapp_number = get_optional_env("PHARMACART_WHATSAPP_NUMBER")
            .map(|raw| {
                MobileNumber::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("PHARMACART_WHATSAPP_NUMBER".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let delivery_fee = match get_optional_env("PHARMACART_DELIVERY_FEE") {
            Some(raw) => parse_delivery_fee(&raw)?,
            None => Decimal::from(DEFAULT_DELIVERY_FEE),
        };

        Ok(Self {
            whatsapp_number,
            delivery_fee,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable (empty values count as unset).
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a whole number of seconds, rejecting zero.
fn get_secs_or_default(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(Duration::from_secs(default));
    };
    parse_secs(key, &raw)
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse the API base URL, forcing a trailing slash so relative joins
/// (`cart/add`) stay under any path prefix such as `/api/v1/`.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_delivery_fee(raw: &str) -> Result<Decimal, ConfigError> {
    let fee = Decimal::from_str(raw.trim()).map_err(|e| {
        ConfigError::InvalidEnvVar("PHARMACART_DELIVERY_FEE".to_string(), e.to_string())
    })?;
    if fee.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            "PHARMACART_DELIVERY_FEE".to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(fee)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("TEST", "https://api.example.in/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.example.in/v1/");
        assert_eq!(url.join("cart/add").unwrap().path(), "/v1/cart/add");
    }

    #[test]
    fn test_parse_base_url_root() {
        let url = parse_base_url("TEST", "http://localhost:8000").unwrap();
        assert_eq!(url.join("cart/").unwrap().as_str(), "http://localhost:8000/cart/");
    }

    #[test]
    fn test_parse_base_url_rejects_non_http() {
        let result = parse_base_url("TEST", "ftp://example.com");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));

        let result = parse_base_url("TEST", "not a url");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("TEST", "8").unwrap(), Duration::from_secs(8));
        assert!(parse_secs("TEST", "0").is_err());
        assert!(parse_secs("TEST", "soon").is_err());
    }

    #[test]
    fn test_parse_delivery_fee() {
        assert_eq!(parse_delivery_fee("49.50").unwrap(), Decimal::new(4950, 2));
        assert_eq!(parse_delivery_fee("0").unwrap(), Decimal::ZERO);
        assert!(parse_delivery_fee("-1").is_err());
        assert!(parse_delivery_fee("free").is_err());
    }

    #[test]
    fn test_checkout_config_default_fee() {
        assert_eq!(CheckoutConfig::default().delivery_fee, Decimal::from(50));
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let mut config = ApiConfig::new("https://api.example.in").unwrap();
        config.access_token = Some(SecretString::from("super_secret_bearer"));

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.example.in"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer"));
    }

    #[test]
    fn test_api_config_access_token() {
        let mut config = ApiConfig::new("https://api.example.in").unwrap();
        assert!(config.access_token().is_none());

        config.access_token = Some(SecretString::from("tok"));
        assert_eq!(config.access_token().unwrap().expose(), "tok");
    }
}
