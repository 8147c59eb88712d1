//! Month-by-month historical open/close fetching
//!
//! One provider call per month step, issued sequentially so upstream rate
//! limits are respected. Per-date problems are logged and skipped; an unknown
//! symbol or an unreachable provider ends the run.

use crate::calendar::{self, Clock};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::provider::{MarketDataProvider, ProviderReply};
use crate::retry::RetryPolicy;
use crate::series::{RawPoint, Series, derive_series};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

static SYMBOL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9][A-Z0-9.:\-]{0,9}$").expect("symbol pattern is valid")
});

/// Trim, uppercase and validate a ticker
pub fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim().to_uppercase();
    if SYMBOL_PATTERN.is_match(&symbol) {
        Ok(symbol)
    } else {
        Err(AnalyticsError::InvalidSymbol(symbol))
    }
}

/// Why a month step produced no point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum SkipReason {
    RateLimited,
    NoData,
    Malformed(String),
}

impl SkipReason {
    /// Skip classification of a recoverable fetch error
    pub fn from_error(err: &AnalyticsError) -> Self {
        match err {
            AnalyticsError::RateLimited { .. } => Self::RateLimited,
            AnalyticsError::NoDataForDate { .. } => Self::NoData,
            AnalyticsError::MalformedPoint { reason, .. } => Self::Malformed(reason.clone()),
            other => Self::Malformed(other.to_string()),
        }
    }
}

/// A month step that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDate {
    pub date: NaiveDate,
    pub reason: SkipReason,
}

/// Result of one fetch run, raw payloads in fetch order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub symbol: String,
    pub requested: u32,
    pub raw: Vec<RawPoint>,
    pub skipped: Vec<SkippedDate>,
}

impl FetchOutcome {
    /// Requested points that were not collected
    pub fn shortfall(&self) -> usize {
        (self.requested as usize).saturating_sub(self.raw.len())
    }

    /// Whether any step was skipped because of rate limiting
    pub fn was_rate_limited(&self) -> bool {
        self.skipped
            .iter()
            .any(|s| s.reason == SkipReason::RateLimited)
    }

    /// Sorted, deduplicated series from the collected payloads
    pub fn series(&self) -> Series {
        derive_series(&self.symbol, &self.raw)
    }
}

/// Walks back from today one calendar month at a time
pub struct HistoricalFetcher {
    provider: Arc<dyn MarketDataProvider>,
    clock: Arc<dyn Clock>,
    retry_policy: RetryPolicy,
    request_timeout: Duration,
}

impl HistoricalFetcher {
    /// Create a fetcher with default retry policy and timeout
    pub fn new(provider: Arc<dyn MarketDataProvider>, clock: Arc<dyn Clock>) -> Self {
        let defaults = AnalyticsConfig::default();
        Self {
            provider,
            clock,
            retry_policy: defaults.retry_policy,
            request_timeout: defaults.request_timeout,
        }
    }

    /// Create a fetcher using the retry policy and timeout from `config`
    pub fn from_config(
        provider: Arc<dyn MarketDataProvider>,
        clock: Arc<dyn Clock>,
        config: &AnalyticsConfig,
    ) -> Self {
        Self::new(provider, clock)
            .with_retry_policy(config.retry_policy.clone())
            .with_request_timeout(config.request_timeout)
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// One provider request, retried while rate limited; a timeout counts as rate limited
    async fn request(&self, symbol: &str, date: NaiveDate) -> Result<ProviderReply> {
        let provider = &self.provider;
        let timeout = self.request_timeout;
        let operation = format!("{} {} {}", provider.name(), symbol, date);

        self.retry_policy
            .execute(&operation, || async move {
                match tokio::time::timeout(timeout, provider.daily_open_close(symbol, date)).await {
                    Ok(reply) => reply,
                    Err(_) => {
                        warn!("{} {} timed out after {:?}", symbol, date, timeout);
                        Ok(ProviderReply::RateLimited)
                    }
                }
            })
            .await
    }

    /// A usable point, or the error describing why this date yields none
    fn accept(&self, symbol: &str, date: NaiveDate, reply: ProviderReply) -> Result<RawPoint> {
        let malformed = |reason: String| AnalyticsError::MalformedPoint {
            symbol: symbol.to_string(),
            date,
            reason,
        };

        match reply {
            ProviderReply::Success(point) => match point.defect() {
                None => Ok(point),
                Some(reason) => Err(malformed(reason)),
            },
            ProviderReply::Malformed(reason) => Err(malformed(reason)),
            ProviderReply::RateLimited => Err(AnalyticsError::RateLimited {
                provider: self.provider.name().to_string(),
            }),
            ProviderReply::NoDataForDate => Err(AnalyticsError::NoDataForDate {
                symbol: symbol.to_string(),
                date,
            }),
            ProviderReply::SymbolNotFound => {
                Err(AnalyticsError::SymbolNotFound(symbol.to_string()))
            }
        }
    }

    /// Fetch up to `months` open/close payloads for `symbol`
    ///
    /// Returns whatever was collected after `months` steps, possibly nothing.
    pub async fn fetch_series(&self, symbol: &str, months: u32) -> Result<FetchOutcome> {
        if months == 0 {
            return Err(AnalyticsError::Config(
                "months must be at least 1".to_string(),
            ));
        }

        let symbol = normalize_symbol(symbol)?;
        let today = self.clock.today();
        let target = months as usize;

        info!(%symbol, months, %today, "Fetching historical open/close");

        let mut outcome = FetchOutcome {
            symbol: symbol.clone(),
            requested: months,
            raw: Vec::with_capacity(target),
            skipped: Vec::new(),
        };

        for step in 0..months {
            if outcome.raw.len() == target {
                break;
            }

            let date = calendar::target_date(today, step);
            debug!(%symbol, step, %date, "Requesting open/close");

            let reply = self.request(&symbol, date).await;
            match reply.and_then(|reply| self.accept(&symbol, date, reply)) {
                Ok(point) => outcome.raw.push(point),
                Err(err) if err.is_recoverable() => {
                    let reason = SkipReason::from_error(&err);
                    warn!(%symbol, %date, %err, "Skipping date");
                    outcome.skipped.push(SkippedDate { date, reason });
                }
                Err(err) => {
                    error!(%symbol, %date, %err, "Aborting fetch");
                    return Err(err);
                }
            }
        }

        if outcome.shortfall() > 0 {
            warn!(
                %symbol,
                collected = outcome.raw.len(),
                requested = months,
                "Fetch finished short of the requested number of points"
            );
        } else {
            info!(%symbol, collected = outcome.raw.len(), "Fetch complete");
        }

        Ok(outcome)
    }
}
