//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPFRONT_API_URL` - Gateway base URL (default: `http://127.0.0.1:5000/api`)
//! - `SHOPFRONT_DATA_DIR` - Directory for the token and guest cart (default: `.shopfront`)
//! - `SHOPFRONT_CONNECT_TIMEOUT_SECS` - HTTP connect timeout (default: 10)
//! - `SHOPFRONT_PRODUCT_CACHE_TTL_SECS` - Product cache TTL (default: 300)
//! - `SHOPFRONT_PRODUCT_CACHE_CAPACITY` - Product cache size (default: 1000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";
const DEFAULT_DATA_DIR: &str = ".shopfront";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Gateway connection settings
    pub gateway: GatewayConfig,
    /// Directory holding the persisted token and guest cart
    pub data_dir: PathBuf,
    /// Product lookup cache settings
    pub product_cache: ProductCacheConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Remote gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL every endpoint path is appended to (e.g. `https://shop.example/api`)
    pub base_url: Url,
    /// TCP connect timeout for gateway requests
    pub connect_timeout: Duration,
}

/// Product cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct ProductCacheConfig {
    /// Maximum number of cached products
    pub capacity: u64,
    /// Time to live for a cached product
    pub ttl: Duration,
}

impl Default for ProductCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(300),
        }
    }
}

impl GatewayConfig {
    /// Gateway configuration for a base URL with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("SHOPFRONT_API_URL", base_url)?,
            connect_timeout: Duration::from_secs(10),
        })
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(
            "SHOPFRONT_API_URL",
            &get_env_or_default("SHOPFRONT_API_URL", DEFAULT_API_URL),
        )?;
        let connect_timeout =
            Duration::from_secs(get_parsed_or_default("SHOPFRONT_CONNECT_TIMEOUT_SECS", 10)?);
        let data_dir = PathBuf::from(get_env_or_default("SHOPFRONT_DATA_DIR", DEFAULT_DATA_DIR));

        let product_cache = ProductCacheConfig {
            capacity: get_parsed_or_default("SHOPFRONT_PRODUCT_CACHE_CAPACITY", 1000)?,
            ttl: Duration::from_secs(get_parsed_or_default(
                "SHOPFRONT_PRODUCT_CACHE_TTL_SECS",
                300,
            )?),
        };

        Ok(Self {
            gateway: GatewayConfig {
                base_url,
                connect_timeout,
            },
            data_dir,
            product_cache,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_parsed_or_default("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_parsed_or_default("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Configuration pointing at `base_url` with all other values defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not a valid URL.
    pub fn for_gateway(base_url: &str, data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            gateway: GatewayConfig::new(base_url)?,
            data_dir: data_dir.into(),
            product_cache: ProductCacheConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse the gateway base URL.
///
/// A trailing slash is enforced so relative joins keep the path prefix
/// (`/api` + `cart` must become `/api/cart`, not `/cart`).
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
