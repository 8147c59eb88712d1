//! Market data provider abstraction and clients

pub mod polygon;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub use crate::series::RawPoint;
pub use polygon::PolygonClient;

/// Classified provider answer for one `(symbol, date)` request
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    /// Payload received; the close still has to be validated
    Success(RawPoint),
    /// Provider asked us to back off (or the call timed out)
    RateLimited,
    /// Provider does not know the symbol
    SymbolNotFound,
    /// No session recorded for that date
    NoDataForDate,
    /// Body could not be decoded
    Malformed(String),
}

/// Daily open/close source
///
/// Per-date conditions come back as a [`ProviderReply`]; `Err` is reserved
/// for failures that end the whole fetch, such as an unreachable provider.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &str;

    /// Daily open/close for `symbol` on `date`
    async fn daily_open_close(&self, symbol: &str, date: NaiveDate) -> Result<ProviderReply>;
}
