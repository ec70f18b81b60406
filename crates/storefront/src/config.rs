//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `MARKETPLACE_API_URL` - Backend base URL (default: `https://e-commerce-raq1.onrender.com`)
//! - `MARKETPLACE_TIMEOUT_SECS` - Request timeout (default: 60)
//! - `MARKETPLACE_MAX_RETRIES` - Retries for 502/503/504 (default: 3)
//! - `MARKETPLACE_RETRY_DELAY_MS` - Pause between retries (default: 2000)
//! - `MARKETPLACE_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `MARKETPLACE_SESSION_FILE` - Where the CLI keeps login tokens
//! - `MARKETPLACE_PROVINCES_FILE` - Local province/commune JSON

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Production backend (Render free tier, slow cold starts).
pub const DEFAULT_API_URL: &str = "https://e-commerce-raq1.onrender.com";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend base URL
    pub api_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// How many times a 502/503/504 is retried
    pub max_retries: u32,
    /// Pause between retries
    pub retry_delay: Duration,
    /// Lifetime of cached catalog reads
    pub cache_ttl: Duration,
    /// Session file for the CLI
    pub session_file: Option<PathBuf>,
    /// Local province/commune data
    pub provinces_file: Option<PathBuf>,
}

impl StorefrontConfig {
    /// Defaults pointed at `api_url`.
    #[must_use]
    pub const fn new(api_url: Url) -> Self {
        Self {
            api_url,
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_millis(2000),
            cache_ttl: Duration::from_secs(300),
            session_file: None,
            provinces_file: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but empty or unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = get_env_or_default("MARKETPLACE_API_URL", DEFAULT_API_URL)?;
        let api_url = Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("MARKETPLACE_API_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(parse_env_or("MARKETPLACE_TIMEOUT_SECS", 60)?),
            max_retries: parse_env_or("MARKETPLACE_MAX_RETRIES", 3)?,
            retry_delay: Duration::from_millis(parse_env_or("MARKETPLACE_RETRY_DELAY_MS", 2000)?),
            cache_ttl: Duration::from_secs(parse_env_or("MARKETPLACE_CACHE_TTL_SECS", 300)?),
            session_file: get_optional_env("MARKETPLACE_SESSION_FILE").map(PathBuf::from),
            provinces_file: get_optional_env("MARKETPLACE_PROVINCES_FILE").map(PathBuf::from),
        })
    }

    /// Resolve a backend path such as `/api/v1/products` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.api_url.join(path)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value. A variable that is set
/// but blank is an error rather than a silent fallback.
fn get_env_or_default(key: &str, default: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::MissingEnvVar(key.to_string())),
        Ok(value) => Ok(value),
        Err(_) => Ok(default.to_string()),
    }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + ToString,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, &default.to_string())?
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::new(Url::parse(DEFAULT_API_URL).unwrap());
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_endpoint_join() {
        let config = StorefrontConfig::new(Url::parse("http://127.0.0.1:8080").unwrap());
        assert_eq!(
            config.endpoint("/api/v1/products").unwrap().as_str(),
            "http://127.0.0.1:8080/api/v1/products"
        );
    }

    #[test]
    #[allow(unsafe_code)]
    fn test_parse_env_or_rejects_garbage() {
        // SAFETY: test-only, variable name unique to this test
        unsafe { std::env::set_var("MARKETPLACE_TEST_RETRIES", "lots") };
        let err = parse_env_or::<u32>("MARKETPLACE_TEST_RETRIES", 3).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));

        unsafe { std::env::set_var("MARKETPLACE_TEST_RETRIES", " ") };
        let err = parse_env_or::<u32>("MARKETPLACE_TEST_RETRIES", 3).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));

        unsafe { std::env::remove_var("MARKETPLACE_TEST_RETRIES") };
        assert_eq!(parse_env_or::<u32>("MARKETPLACE_TEST_RETRIES", 3).unwrap(), 3);
    }
}
