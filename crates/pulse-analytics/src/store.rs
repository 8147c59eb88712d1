//! Per-symbol persistence for raw fetch output and derived series

use crate::error::{AnalyticsError, Result};
use crate::series::{RawPoint, Series};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::debug;

/// Repository for pipeline state, keyed by symbol
///
/// A write replaces whatever the previous run stored for that symbol.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Store raw fetch output and mark `symbol` as the latest ingested
    async fn put_raw(&self, symbol: &str, raw: &[RawPoint]) -> Result<()>;

    async fn get_raw(&self, symbol: &str) -> Result<Option<Vec<RawPoint>>>;

    async fn put_series(&self, series: &Series) -> Result<()>;

    async fn get_series(&self, symbol: &str) -> Result<Option<Series>>;

    /// Symbol of the most recent `put_raw`
    async fn latest_symbol(&self) -> Result<Option<String>>;
}

#[derive(Debug, Default)]
struct MemoryState {
    raw: HashMap<String, Vec<RawPoint>>,
    series: HashMap<String, Series>,
    latest: Option<String>,
}

/// Thread-safe in-process store
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn put_raw(&self, symbol: &str, raw: &[RawPoint]) -> Result<()> {
        let mut state = self.state.write().await;
        state.raw.insert(symbol.to_string(), raw.to_vec());
        state.latest = Some(symbol.to_string());
        Ok(())
    }

    async fn get_raw(&self, symbol: &str) -> Result<Option<Vec<RawPoint>>> {
        Ok(self.state.read().await.raw.get(symbol).cloned())
    }

    async fn put_series(&self, series: &Series) -> Result<()> {
        let mut state = self.state.write().await;
        state.series.insert(series.symbol.clone(), series.clone());
        Ok(())
    }

    async fn get_series(&self, symbol: &str) -> Result<Option<Series>> {
        Ok(self.state.read().await.series.get(symbol).cloned())
    }

    async fn latest_symbol(&self) -> Result<Option<String>> {
        Ok(self.state.read().await.latest.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LatestPointer {
    symbol: String,
}

/// Two JSON documents per symbol under a data directory
///
/// `<SYMBOL>.raw.json` holds the fetch output in fetch order,
/// `<SYMBOL>.series.json` the derived series, and `latest.json` points at the
/// most recently ingested symbol.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

fn persistence_error(context: &str, path: &Path, err: impl std::fmt::Display) -> AnalyticsError {
    AnalyticsError::Persistence(format!("{context} {}: {err}", path.display()))
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| persistence_error("creating", &dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &str, kind: &str) -> PathBuf {
        let stem: String = symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{stem}.{kind}.json"))
    }

    fn latest_path(&self) -> PathBuf {
        self.dir.join("latest.json")
    }

    /// Replace `path` atomically through a uniquely named temp file in the same directory
    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        let dir = self.dir.clone();
        let target = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut tmp = NamedTempFile::new_in(&dir)
                .map_err(|e| persistence_error("creating temp file in", &dir, e))?;
            tmp.write_all(&bytes)
                .map_err(|e| persistence_error("writing", tmp.path(), e))?;
            tmp.persist(&target)
                .map_err(|e| persistence_error("replacing", &target, e.error))?;
            Ok::<_, AnalyticsError>(())
        })
        .await
        .map_err(|e| AnalyticsError::Persistence(format!("write task failed: {e}")))??;

        debug!("Wrote {}", path.display());
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(persistence_error("reading", path, e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| persistence_error("decoding", path, e))
    }
}

#[async_trait]
impl SeriesStore for JsonFileStore {
    async fn put_raw(&self, symbol: &str, raw: &[RawPoint]) -> Result<()> {
        self.write_json(&self.path_for(symbol, "raw"), raw).await?;
        self.write_json(
            &self.latest_path(),
            &LatestPointer {
                symbol: symbol.to_string(),
            },
        )
        .await
    }

    async fn get_raw(&self, symbol: &str) -> Result<Option<Vec<RawPoint>>> {
        self.read_json(&self.path_for(symbol, "raw")).await
    }

    async fn put_series(&self, series: &Series) -> Result<()> {
        self.write_json(&self.path_for(&series.symbol, "series"), series)
            .await
    }

    async fn get_series(&self, symbol: &str) -> Result<Option<Series>> {
        self.read_json(&self.path_for(symbol, "series")).await
    }

    async fn latest_symbol(&self) -> Result<Option<String>> {
        Ok(self
            .read_json::<LatestPointer>(&self.latest_path())
            .await?
            .map(|pointer| pointer.symbol))
    }
}
