//! Error types for market analytics operations

use chrono::NaiveDate;
use thiserror::Error;

/// Market analytics specific errors
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Provider asked us to slow down
    #[error("Rate limit exceeded for {provider}")]
    RateLimited {
        provider: String,
    },

    /// Provider does not know the symbol
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Symbol failed local validation
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Provider has no session for the requested date
    #[error("No data for {symbol} on {date}")]
    NoDataForDate {
        symbol: String,
        date: NaiveDate,
    },

    /// Provider payload lacked a usable date, open or close
    #[error("Malformed point for {symbol} on {date}: {reason}")]
    MalformedPoint {
        symbol: String,
        date: NaiveDate,
        reason: String,
    },

    /// Provider could not be reached or refused the request outright
    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// A completed fetch collected nothing usable
    #[error("No data found for {0}")]
    NoData(String),

    /// Store read or write failed
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalyticsError {
    /// Whether the fetch loop may skip the current date and carry on
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::NoDataForDate { .. } | Self::MalformedPoint { .. }
        )
    }
}

/// Result type alias for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalyticsError::SymbolNotFound("ZZZZ".to_string());
        assert_eq!(err.to_string(), "Symbol not found: ZZZZ");

        let err = AnalyticsError::NoDataForDate {
            symbol: "AAPL".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
        };
        assert_eq!(err.to_string(), "No data for AAPL on 2024-06-13");
    }

    #[test]
    fn test_recoverable_classes() {
        assert!(
            AnalyticsError::RateLimited {
                provider: "polygon".to_string()
            }
            .is_recoverable()
        );
        assert!(
            AnalyticsError::MalformedPoint {
                symbol: "AAPL".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 6, 13).unwrap(),
                reason: "open is missing".to_string(),
            }
            .is_recoverable()
        );
        assert!(!AnalyticsError::SymbolNotFound("X".to_string()).is_recoverable());
        assert!(!AnalyticsError::ProviderUnreachable("down".to_string()).is_recoverable());
        assert!(!AnalyticsError::Persistence("disk full".to_string()).is_recoverable());
    }
}
