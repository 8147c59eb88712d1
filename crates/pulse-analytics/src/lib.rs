//! Market-data analytics pipeline
//!
//! This crate fetches historical daily open/close data for a ticker and derives
//! trend, volatility and risk metrics from it. It includes:
//!
//! - A Polygon daily open/close client behind the `MarketDataProvider` trait
//! - Month-by-month fetching with trading-day adjustment and skip-on-error semantics
//! - Series derivation (sort, deduplicate) and per-symbol persistence
//! - Least-squares trend, month-over-month changes, volatility and risk tiers
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_analytics::{AnalyticsConfig, AnalyticsService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AnalyticsConfig::builder().with_env_api_key().build()?;
//!     let service = AnalyticsService::from_config(&config).await?;
//!
//!     service.ingest("AAPL").await?;
//!     if let Some(analysis) = service.analyze(Some("AAPL")).await? {
//!         println!("{:?}", analysis.trend.trend);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod calendar;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod provider;
pub mod retry;
pub mod series;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use analyzer::{
    Analysis, PercentChangeEntry, RiskAssessment, RiskLevel, Trend, TrendAnalyzer, TrendResult,
};
pub use calendar::{Clock, FixedClock, SystemClock};
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, Result};
pub use fetcher::{FetchOutcome, HistoricalFetcher, SkipReason, SkippedDate};
pub use provider::{MarketDataProvider, PolygonClient, ProviderReply};
pub use retry::RetryPolicy;
pub use series::{PricePoint, RawPoint, Series, derive_series};
pub use service::{AnalyticsService, IngestReport};
pub use store::{JsonFileStore, MemoryStore, SeriesStore};
