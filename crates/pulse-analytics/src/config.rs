//! Configuration for market analytics operations

use crate::error::{AnalyticsError, Result};
use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Default Polygon REST endpoint
pub const DEFAULT_POLYGON_BASE_URL: &str = "https://api.polygon.io";

/// Number of month steps fetched per ingest request
pub const DEFAULT_MONTHS: u32 = 5;

/// Configuration for market analytics operations
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Month steps walked back from today per fetch
    pub months: u32,

    /// Upper bound for a single provider call
    pub request_timeout: Duration,

    /// Client-side request budget (requests per minute)
    pub rate_limit_per_minute: u32,

    /// Backoff applied when the provider reports a rate limit
    pub retry_policy: RetryPolicy,

    /// Polygon API key
    pub polygon_api_key: Option<String>,

    /// Polygon base URL (overridable for tests and proxies)
    pub polygon_base_url: String,

    /// Directory for the JSON file store; in-memory store when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            months: DEFAULT_MONTHS,
            request_timeout: Duration::from_secs(10),
            rate_limit_per_minute: 5, // free tier
            retry_policy: RetryPolicy::default(),
            polygon_api_key: None,
            polygon_base_url: DEFAULT_POLYGON_BASE_URL.to_string(),
            data_dir: None,
        }
    }
}

impl AnalyticsConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalyticsConfigBuilder {
        AnalyticsConfigBuilder::default()
    }

    /// Load Polygon API key from environment
    pub fn with_env_api_key(mut self) -> Self {
        if let Ok(key) = std::env::var("POLYGON_API_KEY") {
            self.polygon_api_key = Some(key);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.months == 0 {
            return Err(AnalyticsError::Config(
                "months must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_per_minute == 0 {
            return Err(AnalyticsError::Config(
                "rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.retry_policy.max_attempts == 0 {
            return Err(AnalyticsError::Config(
                "retry_policy.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(AnalyticsError::Config(
                "request_timeout must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for AnalyticsConfig
#[derive(Debug, Default)]
pub struct AnalyticsConfigBuilder {
    months: Option<u32>,
    request_timeout: Option<Duration>,
    rate_limit_per_minute: Option<u32>,
    retry_policy: Option<RetryPolicy>,
    polygon_api_key: Option<String>,
    polygon_base_url: Option<String>,
    data_dir: Option<PathBuf>,
}

impl AnalyticsConfigBuilder {
    /// Set the number of month steps
    pub fn months(mut self, months: u32) -> Self {
        self.months = Some(months);
        self
    }

    /// Set per-call timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set client-side rate limit
    pub fn rate_limit_per_minute(mut self, limit: u32) -> Self {
        self.rate_limit_per_minute = Some(limit);
        self
    }

    /// Set rate-limit retry policy
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Set Polygon API key
    pub fn polygon_api_key(mut self, key: impl Into<String>) -> Self {
        self.polygon_api_key = Some(key.into());
        self
    }

    /// Set Polygon base URL
    pub fn polygon_base_url(mut self, url: impl Into<String>) -> Self {
        self.polygon_base_url = Some(url.into());
        self
    }

    /// Persist to JSON files under `dir`
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Load Polygon API key from environment
    pub fn with_env_api_key(mut self) -> Self {
        if let Ok(key) = std::env::var("POLYGON_API_KEY") {
            self.polygon_api_key = Some(key);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalyticsConfig> {
        let defaults = AnalyticsConfig::default();

        let config = AnalyticsConfig {
            months: self.months.unwrap_or(defaults.months),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            rate_limit_per_minute: self
                .rate_limit_per_minute
                .unwrap_or(defaults.rate_limit_per_minute),
            retry_policy: self.retry_policy.unwrap_or(defaults.retry_policy),
            polygon_api_key: self.polygon_api_key,
            polygon_base_url: self.polygon_base_url.unwrap_or(defaults.polygon_base_url),
            data_dir: self.data_dir,
        };

        config.validate()?;
        Ok(config)
    }
}
