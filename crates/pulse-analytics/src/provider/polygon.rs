//! Polygon daily open/close client

use super::{MarketDataProvider, ProviderReply};
use crate::config::{AnalyticsConfig, DEFAULT_POLYGON_BASE_URL};
use crate::error::{AnalyticsError, Result};
use crate::series::RawPoint;
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const PROVIDER_NAME: &str = "Polygon";

/// Polygon API client
#[derive(Debug, Clone)]
pub struct PolygonClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

/// Error body shape shared by Polygon's non-2xx replies
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn text(&self) -> String {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .or(self.status.as_deref())
            .unwrap_or_default()
            .to_string()
    }

    fn mentions_symbol(&self) -> bool {
        let text = self.text().to_ascii_lowercase();
        text.contains("ticker") || text.contains("symbol")
    }
}

/// Classify a Polygon HTTP reply
///
/// Per-date outcomes become a [`ProviderReply`]; replies that mean the
/// provider cannot serve us at all become [`AnalyticsError::ProviderUnreachable`].
pub fn classify_reply(status: StatusCode, body: &str) -> Result<ProviderReply> {
    match status {
        StatusCode::OK => match serde_json::from_str::<RawPoint>(body) {
            Ok(point) => match point.status.as_deref() {
                None | Some("OK") => Ok(ProviderReply::Success(point)),
                Some(_) => Ok(ProviderReply::NoDataForDate),
            },
            Err(e) => Ok(ProviderReply::Malformed(e.to_string())),
        },
        StatusCode::TOO_MANY_REQUESTS => Ok(ProviderReply::RateLimited),
        StatusCode::NOT_FOUND => {
            if ErrorBody::parse(body).mentions_symbol() {
                Ok(ProviderReply::SymbolNotFound)
            } else {
                Ok(ProviderReply::NoDataForDate)
            }
        }
        StatusCode::BAD_REQUEST => {
            let error = ErrorBody::parse(body);
            if error.mentions_symbol() {
                Ok(ProviderReply::SymbolNotFound)
            } else {
                Err(AnalyticsError::ProviderUnreachable(format!(
                    "{PROVIDER_NAME} rejected request: {}",
                    error.text()
                )))
            }
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(
            AnalyticsError::ProviderUnreachable(format!(
                "{PROVIDER_NAME} refused credentials ({status})"
            )),
        ),
        _ => Err(AnalyticsError::ProviderUnreachable(format!(
            "{PROVIDER_NAME} returned status {status}"
        ))),
    }
}

impl PolygonClient {
    /// Create a new Polygon client with API key and rate limit
    ///
    /// # Arguments
    /// * `api_key` - Polygon API key
    /// * `rate_limit` - Maximum requests per minute (5 on the free tier)
    pub fn new(api_key: impl Into<String>, rate_limit: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_POLYGON_BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create from analytics configuration
    pub fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        let api_key = config.polygon_api_key.clone().ok_or_else(|| {
            AnalyticsError::Config("Polygon API key is not configured".to_string())
        })?;

        Self::new(api_key, config.rate_limit_per_minute)
            .with_base_url(config.polygon_base_url.clone())
            .with_timeout(config.request_timeout)
    }

    /// Create from environment variable POLYGON_API_KEY with default rate limit
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("POLYGON_API_KEY").map_err(|_| {
            AnalyticsError::Config("POLYGON_API_KEY environment variable not set".to_string())
        })?;

        Ok(Self::new(api_key, 5))
    }

    /// Point the client at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound every HTTP call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    fn endpoint(&self, symbol: &str, date: NaiveDate) -> String {
        format!(
            "{}/v1/open-close/{}/{}",
            self.base_url,
            symbol,
            date.format("%Y-%m-%d")
        )
    }
}

#[async_trait]
impl MarketDataProvider for PolygonClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn daily_open_close(&self, symbol: &str, date: NaiveDate) -> Result<ProviderReply> {
        // Wait for rate limiter
        self.rate_limiter.until_ready().await;

        let url = self.endpoint(symbol, date);
        debug!("GET {}", url);

        let response = match self
            .client
            .get(&url)
            .query(&[("adjusted", "true"), ("apiKey", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Ok(ProviderReply::RateLimited),
            Err(e) => {
                return Err(AnalyticsError::ProviderUnreachable(format!(
                    "{PROVIDER_NAME} request failed: {e}"
                )));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Ok(ProviderReply::RateLimited),
            Err(e) => return Err(e.into()),
        };

        classify_reply(status, &body)
    }
}
