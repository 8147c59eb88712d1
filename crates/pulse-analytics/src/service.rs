//! Fetch, persist, derive and analyze, one symbol at a time

use crate::analyzer::{Analysis, TrendAnalyzer};
use crate::calendar::{Clock, SystemClock};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::fetcher::{HistoricalFetcher, SkippedDate, normalize_symbol};
use crate::provider::{MarketDataProvider, PolygonClient};
use crate::series::derive_series;
use crate::store::{JsonFileStore, MemoryStore, SeriesStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Summary of one ingest run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub symbol: String,
    pub requested: u32,
    pub collected: usize,
    pub points: usize,
    pub skipped: Vec<SkippedDate>,
}

/// Pipeline entry point shared by the HTTP boundary and the CLI
pub struct AnalyticsService {
    fetcher: HistoricalFetcher,
    store: Arc<dyn SeriesStore>,
    analyzer: TrendAnalyzer,
    months: u32,
    provider_name: String,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl AnalyticsService {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn SeriesStore>,
        config: &AnalyticsConfig,
    ) -> Self {
        Self {
            provider_name: provider.name().to_string(),
            fetcher: HistoricalFetcher::from_config(provider, clock, config),
            store,
            analyzer: TrendAnalyzer::new(),
            months: config.months,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Polygon provider, wall clock, and a file store when `data_dir` is set
    pub async fn from_config(config: &AnalyticsConfig) -> Result<Self> {
        config.validate()?;

        let provider = Arc::new(PolygonClient::from_config(config)?);
        let store: Arc<dyn SeriesStore> = match &config.data_dir {
            Some(dir) => Arc::new(JsonFileStore::open(dir).await?),
            None => Arc::new(MemoryStore::new()),
        };

        Ok(Self::new(provider, Arc::new(SystemClock), store, config))
    }

    pub fn store(&self) -> &Arc<dyn SeriesStore> {
        &self.store
    }

    async fn guard_for(&self, symbol: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        Arc::clone(in_flight.entry(symbol.to_string()).or_default())
    }

    /// Drop the symbol's guard from the map once no other run holds it
    async fn release(&self, symbol: &str, guard: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // One reference in the map, one in `guard`.
        if Arc::strong_count(&guard) <= 2 {
            in_flight.remove(symbol);
        }
    }

    /// Fetch the configured number of months and replace the stored state
    ///
    /// Nothing is written when the fetch collected no usable point.
    pub async fn ingest(&self, symbol: &str) -> Result<IngestReport> {
        let symbol = normalize_symbol(symbol)?;
        let guard = self.guard_for(&symbol).await;
        let result = {
            let _running = guard.lock().await;
            self.ingest_locked(&symbol).await
        };
        self.release(&symbol, guard).await;
        result
    }

    async fn ingest_locked(&self, symbol: &str) -> Result<IngestReport> {
        let outcome = self.fetcher.fetch_series(symbol, self.months).await?;
        let series = outcome.series();

        if series.is_empty() {
            return Err(if outcome.was_rate_limited() {
                AnalyticsError::RateLimited {
                    provider: self.provider_name.clone(),
                }
            } else {
                AnalyticsError::NoData(symbol.to_string())
            });
        }

        // Raw output is the source of truth; `analyze` re-derives the series
        // from it, so a failed series write is repaired on the next read.
        self.store.put_raw(symbol, &outcome.raw).await?;
        self.store.put_series(&series).await?;

        info!(%symbol, points = series.len(), "Stored series");

        Ok(IngestReport {
            symbol: symbol.to_string(),
            requested: outcome.requested,
            collected: outcome.raw.len(),
            points: series.len(),
            skipped: outcome.skipped,
        })
    }

    /// Re-derive the series from stored raw output and analyze it
    ///
    /// Uses the latest ingested symbol when `symbol` is `None`. `Ok(None)`
    /// means there is nothing to analyze yet.
    pub async fn analyze(&self, symbol: Option<&str>) -> Result<Option<Analysis>> {
        let symbol = match symbol {
            Some(symbol) => normalize_symbol(symbol)?,
            None => match self.store.latest_symbol().await? {
                Some(symbol) => symbol,
                None => return Ok(None),
            },
        };

        let guard = self.guard_for(&symbol).await;
        let result = {
            let _running = guard.lock().await;
            self.analyze_locked(&symbol).await
        };
        self.release(&symbol, guard).await;
        result
    }

    async fn analyze_locked(&self, symbol: &str) -> Result<Option<Analysis>> {
        let Some(raw) = self.store.get_raw(symbol).await? else {
            return Ok(None);
        };

        let series = derive_series(symbol, &raw);
        self.store.put_series(&series).await?;

        Ok(self.analyzer.analyze(&series))
    }

    #[cfg(test)]
    async fn in_flight_len(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}
