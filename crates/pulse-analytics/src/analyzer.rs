//! Trend, volatility and risk metrics over a price series
//!
//! The analyzer never fails: an empty series has no analysis and a series
//! with fewer than two usable closes has no risk assessment.

use crate::series::Series;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::StandardDeviation;

/// Direction of the least-squares fit through the closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// Risk tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Moderate Risk")]
    Moderate,
    #[serde(rename = "High Risk")]
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Low => "Low Risk",
            Self::Moderate => "Moderate Risk",
            Self::High => "High Risk",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    pub first_open: f64,
    pub last_close: f64,
    pub net_change: f64,
    pub slope: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentChangeEntry {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub percent_change: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub monthly_percent_changes: Vec<PercentChangeEntry>,
    pub mean_percent_change: f64,
    pub standard_deviation: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub trend: TrendResult,
    pub risk: Option<RiskAssessment>,
}

/// Ordinary least-squares slope of `values` against their index
///
/// Fewer than two values, or identical values, give exactly zero.
pub fn regression_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 || values.windows(2).all(|w| w[0] == w[1]) {
        return 0.0;
    }

    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }

    (n * sum_xy - sum_x * sum_y) / denominator
}

fn classify_slope(slope: f64) -> Trend {
    if slope > 0.0 {
        Trend::Increasing
    } else if slope < 0.0 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Two decimals with an explicit sign; zero is `+0.00`
pub fn format_percent_change(value: f64) -> String {
    let formatted = format!("{value:.2}");
    match formatted.strip_prefix('-') {
        // -0.0 and tiny negatives round to zero
        Some("0.00") => "+0.00".to_string(),
        Some(_) => formatted,
        None => format!("+{formatted}"),
    }
}

/// Tier from volatility and mean change, first matching rule wins
pub fn classify_risk(std_dev: f64, mean: f64) -> RiskLevel {
    if std_dev > 10.0 && mean < 0.0 {
        RiskLevel::High
    } else if std_dev > 5.0 || mean.abs() > 5.0 {
        RiskLevel::Moderate
    } else if mean > 0.0 && std_dev < 2.0 {
        RiskLevel::Low
    } else {
        RiskLevel::Moderate
    }
}

/// Mean and population standard deviation
pub fn mean_and_std_dev(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let mut indicator = StandardDeviation::new(values.len()).ok()?;
    let std_dev = values.iter().fold(0.0, |_, &v| indicator.next(v));

    Some((mean, std_dev))
}

/// Computes trend and risk for a series
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendAnalyzer;

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// `None` when the series is empty
    pub fn analyze(&self, series: &Series) -> Option<Analysis> {
        let trend = self.trend(series)?;
        let risk = self.risk(series);
        Some(Analysis { trend, risk })
    }

    pub fn trend(&self, series: &Series) -> Option<TrendResult> {
        let first = series.first()?;
        let last = series.last()?;

        if series.len() == 1 {
            return Some(TrendResult {
                first_open: first.open,
                last_close: last.close,
                net_change: 0.0,
                slope: 0.0,
                trend: Trend::Stable,
            });
        }

        let slope = regression_slope(&series.closes());
        Some(TrendResult {
            first_open: first.open,
            last_close: last.close,
            net_change: last.close - first.open,
            slope,
            trend: classify_slope(slope),
        })
    }

    /// Consecutive close-to-close changes, with the raw values for statistics
    ///
    /// A pair whose earlier close is zero has no defined ratio and is left out.
    pub fn percent_changes(&self, series: &Series) -> (Vec<PercentChangeEntry>, Vec<f64>) {
        series
            .points
            .windows(2)
            .filter(|pair| pair[0].close != 0.0)
            .map(|pair| {
                let change = (pair[1].close - pair[0].close) / pair[0].close * 100.0;
                let entry = PercentChangeEntry {
                    from: pair[0].date,
                    to: pair[1].date,
                    percent_change: format_percent_change(change),
                };
                (entry, change)
            })
            .unzip()
    }

    /// `None` when no percent change could be computed
    pub fn risk(&self, series: &Series) -> Option<RiskAssessment> {
        let (entries, changes) = self.percent_changes(series);
        let (mean, std_dev) = mean_and_std_dev(&changes)?;

        Some(RiskAssessment {
            monthly_percent_changes: entries,
            mean_percent_change: mean,
            standard_deviation: std_dev,
            risk_level: classify_risk(std_dev, mean),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PricePoint;
    use serde_json::json;

    fn series(closes: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                symbol: "TEST".to_string(),
                date: start + chrono::Days::new(7 * i as u64),
                open: close - 1.0,
                close,
            })
            .collect();
        Series::from_points("TEST", points)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_increasing_closes() {
        let trend = TrendAnalyzer::new().trend(&series(&[1.0, 2.0, 3.5, 4.0, 9.0])).unwrap();
        assert_eq!(trend.trend, Trend::Increasing);
        assert!(trend.slope > 0.0);
    }

    #[test]
    fn test_decreasing_closes() {
        let trend = TrendAnalyzer::new().trend(&series(&[9.0, 7.0, 6.5, 2.0])).unwrap();
        assert_eq!(trend.trend, Trend::Decreasing);
    }

    #[test]
    fn test_constant_closes_are_stable() {
        let trend = TrendAnalyzer::new().trend(&series(&[0.1, 0.1, 0.1, 0.1, 0.1])).unwrap();
        assert_eq!(trend.trend, Trend::Stable);
        assert_eq!(trend.slope, 0.0);
    }

    #[test]
    fn test_regression_slope_value() {
        // y = 2x + 1
        assert!(approx(regression_slope(&[1.0, 3.0, 5.0, 7.0]), 2.0));
        assert_eq!(regression_slope(&[42.0]), 0.0);
        assert_eq!(regression_slope(&[]), 0.0);
    }

    #[test]
    fn test_net_change_uses_first_open_and_last_close() {
        let trend = TrendAnalyzer::new().trend(&series(&[10.0, 12.0, 15.0])).unwrap();
        assert_eq!(trend.first_open, 9.0);
        assert_eq!(trend.last_close, 15.0);
        assert!(approx(trend.net_change, 6.0));
    }

    #[test]
    fn test_empty_series_has_no_analysis() {
        assert!(TrendAnalyzer::new().analyze(&Series::default()).is_none());
    }

    #[test]
    fn test_single_point() {
        let analysis = TrendAnalyzer::new().analyze(&series(&[10.0])).unwrap();
        assert_eq!(analysis.trend.trend, Trend::Stable);
        assert_eq!(analysis.trend.net_change, 0.0);
        assert!(analysis.risk.is_none());
    }

    #[test]
    fn test_format_percent_change() {
        assert_eq!(format_percent_change(0.0), "+0.00");
        assert_eq!(format_percent_change(-0.0), "+0.00");
        assert_eq!(format_percent_change(-0.001), "+0.00");
        assert_eq!(format_percent_change(-3.4567), "-3.46");
        assert_eq!(format_percent_change(2.5), "+2.50");
        assert_eq!(format_percent_change(12.345_678), "+12.35");
    }

    #[test]
    fn test_risk_precedence() {
        // Also satisfies the moderate rule; high wins.
        assert_eq!(classify_risk(12.0, -1.0), RiskLevel::High);
        assert_eq!(classify_risk(12.0, 1.0), RiskLevel::Moderate);
        assert_eq!(classify_risk(6.0, 1.0), RiskLevel::Moderate);
        assert_eq!(classify_risk(1.0, -6.0), RiskLevel::Moderate);
        assert_eq!(classify_risk(1.0, 1.0), RiskLevel::Low);
        assert_eq!(classify_risk(3.0, 1.0), RiskLevel::Moderate);
        assert_eq!(classify_risk(1.0, -1.0), RiskLevel::Moderate);
        assert_eq!(classify_risk(0.0, 0.0), RiskLevel::Moderate);
    }

    #[test]
    fn test_population_std_dev() {
        let (mean, sd) = mean_and_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!(approx(mean, 5.0));
        assert!(approx(sd, 2.0));
        assert!(mean_and_std_dev(&[]).is_none());
    }

    #[test]
    fn test_high_risk_series() {
        let risk = TrendAnalyzer::new()
            .risk(&series(&[100.0, 80.0, 100.0, 70.0]))
            .unwrap();

        let changes: Vec<_> = risk
            .monthly_percent_changes
            .iter()
            .map(|e| e.percent_change.as_str())
            .collect();
        assert_eq!(changes, vec!["-20.00", "+25.00", "-30.00"]);
        assert!(risk.mean_percent_change < 0.0);
        assert!(risk.standard_deviation > 10.0);
        assert_eq!(risk.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_low_risk_series() {
        let risk = TrendAnalyzer::new()
            .risk(&series(&[100.0, 101.0, 102.01]))
            .unwrap();
        assert!(approx(risk.mean_percent_change, 1.0));
        assert!(risk.standard_deviation < 1e-6);
        assert_eq!(risk.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_zero_close_pair_is_skipped() {
        let (entries, changes) = TrendAnalyzer::new().percent_changes(&series(&[0.0, 5.0, 10.0]));
        assert_eq!(entries.len(), 1);
        assert!(approx(changes[0], 100.0));
    }

    #[test]
    fn test_serialized_shape() {
        let analysis = TrendAnalyzer::new().analyze(&series(&[100.0, 110.0])).unwrap();
        let value = serde_json::to_value(&analysis).unwrap();

        assert_eq!(value["trend"]["trend"], json!("Increasing"));
        assert_eq!(value["risk"]["riskLevel"], json!("Moderate Risk"));
        assert_eq!(
            value["risk"]["monthlyPercentChanges"][0],
            json!({"from": "2024-01-04", "to": "2024-01-11", "percentChange": "+10.00"})
        );
    }
}
