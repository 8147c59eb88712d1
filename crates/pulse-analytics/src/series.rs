//! Price points and the sorted per-symbol series derived from raw provider output

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Provider payload for one requested date, kept as received
///
/// Every field is optional because the payload is persisted before it is
/// validated. Fields we do not interpret are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn price(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
}

impl RawPoint {
    /// Successful payload with the fields the pipeline reads
    pub fn new(symbol: &str, date: NaiveDate, open: f64, close: f64) -> Self {
        Self {
            status: Some("OK".to_string()),
            symbol: Some(symbol.to_string()),
            from: Some(date.format(DATE_FORMAT).to_string()),
            open: Some(Value::from(open)),
            close: Some(Value::from(close)),
            extra: Map::new(),
        }
    }

    /// Session date, if present and well formed
    pub fn date(&self) -> Option<NaiveDate> {
        self.from
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
    }

    /// Opening price, if numeric, finite and non-negative
    pub fn open_price(&self) -> Option<f64> {
        price(self.open.as_ref())
    }

    /// Closing price, if numeric, finite and non-negative
    pub fn close_price(&self) -> Option<f64> {
        price(self.close.as_ref())
    }

    /// Why this payload cannot become a price point, if it cannot
    pub fn defect(&self) -> Option<String> {
        if self.date().is_none() {
            return Some("date is missing or malformed".to_string());
        }
        price_defect("open", self.open.as_ref())
            .or_else(|| price_defect("close", self.close.as_ref()))
    }
}

fn price_defect(field: &str, value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => Some(format!("{field} is missing")),
        Some(v) if !v.is_number() => Some(format!("{field} is not numeric")),
        Some(_) if price(value).is_none() => Some(format!("{field} is negative")),
        Some(_) => None,
    }
}

/// One observed trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
}

/// Points for one symbol, strictly increasing by date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl Series {
    /// Sort `points` by date and drop repeated dates, keeping the first seen
    pub fn from_points(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);

        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Closing prices in date order
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }
}

/// Build a series from raw provider output
///
/// Entries without a parseable date or usable open/close are dropped. Never
/// fails; no usable entries gives an empty series.
pub fn derive_series(symbol: &str, raw: &[RawPoint]) -> Series {
    let symbol = symbol.trim().to_uppercase();

    let points = raw
        .iter()
        .filter_map(|entry| {
            Some(PricePoint {
                symbol: symbol.clone(),
                date: entry.date()?,
                open: entry.open_price()?,
                close: entry.close_price()?,
            })
        })
        .collect();

    Series::from_points(symbol, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_raw_point_from_provider_payload() {
        let raw: RawPoint = serde_json::from_value(json!({
            "status": "OK",
            "from": "2024-06-13",
            "symbol": "AAPL",
            "open": 214.74,
            "high": 216.75,
            "low": 211.6,
            "close": 214.24,
            "volume": 97862729,
        }))
        .unwrap();

        assert_eq!(raw.date(), Some(date(2024, 6, 13)));
        assert_eq!(raw.open_price(), Some(214.74));
        assert_eq!(raw.close_price(), Some(214.24));
        assert!(raw.defect().is_none());
        assert_eq!(raw.extra.get("volume"), Some(&json!(97862729)));
    }

    #[test]
    fn test_point_defects() {
        let valid = RawPoint::new("AAPL", date(2024, 6, 13), 1.0, 2.0);

        let mut raw = valid.clone();
        raw.close = None;
        assert_eq!(raw.defect().as_deref(), Some("close is missing"));

        raw.close = Some(json!("214.24"));
        assert_eq!(raw.defect().as_deref(), Some("close is not numeric"));

        raw.close = Some(json!(-1.0));
        assert_eq!(raw.defect().as_deref(), Some("close is negative"));

        let mut raw = valid.clone();
        raw.open = Some(Value::Null);
        assert_eq!(raw.defect().as_deref(), Some("open is missing"));

        let mut raw = valid;
        raw.from = Some("13/06/2024".to_string());
        assert_eq!(raw.defect().as_deref(), Some("date is missing or malformed"));
    }

    #[test]
    fn test_derive_sorts_ascending() {
        let raw = vec![
            RawPoint::new("AAPL", date(2024, 6, 10), 10.0, 11.0),
            RawPoint::new("AAPL", date(2024, 4, 11), 8.0, 9.0),
            RawPoint::new("AAPL", date(2024, 5, 9), 9.0, 10.0),
        ];

        let series = derive_series("aapl", &raw);
        assert_eq!(series.symbol, "AAPL");
        let dates: Vec<_> = series.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2024, 4, 11), date(2024, 5, 9), date(2024, 6, 10)]);
    }

    #[test]
    fn test_derive_drops_duplicates_first_seen_wins() {
        let raw = vec![
            RawPoint::new("AAPL", date(2024, 5, 9), 9.0, 10.0),
            RawPoint::new("AAPL", date(2024, 6, 10), 10.0, 11.0),
            RawPoint::new("AAPL", date(2024, 5, 9), 99.0, 100.0),
            RawPoint::new("AAPL", date(2024, 4, 11), 8.0, 9.0),
        ];

        let series = derive_series("AAPL", &raw);
        assert_eq!(series.len(), 3);
        assert!(series.points.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(series.points[1].close, 10.0);
    }

    #[test]
    fn test_derive_skips_unusable_entries() {
        let mut no_close = RawPoint::new("AAPL", date(2024, 6, 10), 10.0, 11.0);
        no_close.close = None;
        let mut bad_date = RawPoint::new("AAPL", date(2024, 5, 9), 9.0, 10.0);
        bad_date.from = Some("09/05/2024".to_string());
        let mut no_open = RawPoint::new("AAPL", date(2024, 4, 11), 8.0, 9.0);
        no_open.open = Some(Value::Null);

        let series = derive_series("AAPL", &[no_close, bad_date, no_open]);
        assert!(series.is_empty());
    }

    #[test]
    fn test_derive_empty_input() {
        let series = derive_series("AAPL", &[]);
        assert!(series.is_empty());
        assert!(series.first().is_none());
    }

    #[test]
    fn test_series_serializes_dates_as_iso() {
        let series = derive_series(
            "MSFT",
            &[RawPoint::new("MSFT", date(2024, 6, 10), 420.0, 425.5)],
        );
        let value = serde_json::to_value(&series).unwrap();
        assert_eq!(value["points"][0]["date"], json!("2024-06-10"));
        assert_eq!(value["points"][0]["close"], json!(425.5));
    }
}
