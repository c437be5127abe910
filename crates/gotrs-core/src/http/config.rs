//! Client configuration
//!
//! Supplied once at construction and immutable afterwards. Values can come
//! from code, from a deserialized config file, or from `GOTRS_*` environment
//! variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default backoff unit; attempt `n` waits `base * 2^n`
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default `User-Agent` header value
pub fn default_user_agent() -> String {
    format!("gotrs-rust-sdk/{}", crate::VERSION)
}

/// Configuration for the HTTP client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API, without trailing slash
    pub base_url: String,
    /// Per-attempt request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff unit between attempts
    #[serde(with = "duration_secs")]
    pub retry_base_delay: Duration,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Log retries at warn level and enable verbose transport logging
    pub debug: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            user_agent: default_user_agent(),
            debug: false,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for a base URL with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            ..Default::default()
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff unit
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable or disable debug mode
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Load configuration from `GOTRS_*` environment variables
    ///
    /// `GOTRS_BASE_URL` is required; `GOTRS_TIMEOUT_SECS`, `GOTRS_MAX_RETRIES`,
    /// `GOTRS_USER_AGENT` and `GOTRS_DEBUG` are optional.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("GOTRS_BASE_URL").map_err(|_| {
            Error::configuration("Environment variable GOTRS_BASE_URL not found")
        })?;
        let mut config = Self::new(base_url);

        if let Ok(value) = std::env::var("GOTRS_TIMEOUT_SECS") {
            let secs: f64 = value.trim().parse().map_err(|_| {
                Error::configuration(format!("Invalid GOTRS_TIMEOUT_SECS: {}", value))
            })?;
            config.timeout = Duration::try_from_secs_f64(secs).map_err(|_| {
                Error::configuration(format!("Invalid GOTRS_TIMEOUT_SECS: {}", value))
            })?;
        }

        if let Ok(value) = std::env::var("GOTRS_MAX_RETRIES") {
            config.max_retries = value.trim().parse().map_err(|_| {
                Error::configuration(format!("Invalid GOTRS_MAX_RETRIES: {}", value))
            })?;
        }

        if let Ok(value) = std::env::var("GOTRS_USER_AGENT") {
            config.user_agent = value;
        }

        if let Ok(value) = std::env::var("GOTRS_DEBUG") {
            config.debug = parse_bool(&value).ok_or_else(|| {
                Error::configuration(format!("Invalid GOTRS_DEBUG: {}", value))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::configuration("Base URL cannot be empty"));
        }

        let url = Url::parse(&self.base_url).map_err(|e| {
            Error::configuration(format!("Invalid base URL {}: {}", self.base_url, e))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::configuration(format!(
                "Unsupported URL scheme: {}",
                url.scheme()
            )));
        }

        if self.timeout.is_zero() {
            return Err(Error::configuration("Timeout cannot be zero"));
        }

        Ok(())
    }
}

/// Strip trailing slashes from a base URL
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Durations as (fractional) seconds in config files
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
