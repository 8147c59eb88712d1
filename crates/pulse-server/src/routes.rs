//! Route table and handlers

use crate::error::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use pulse_analytics::{
    AnalyticsService, PercentChangeEntry, RiskLevel, SkippedDate, TrendResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalyticsService>,
}

/// Build the application router
pub fn router(service: Arc<AnalyticsService>) -> Router {
    Router::new()
        .route("/send-market-symbol", post(send_market_symbol))
        .route("/data-algorithms", get(data_algorithms))
        .route("/health", get(health))
        .with_state(AppState { service })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRequest {
    #[serde(default)]
    pub market_symbol: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: String,
    pub symbol: String,
    pub points: usize,
    pub skipped: Vec<SkippedDate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlgorithmsQuery {
    pub symbol: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmsResponse {
    pub market_trend: Option<TrendResult>,
    pub monthly_percent_changes: Vec<PercentChangeEntry>,
    pub standard_deviation: Option<f64>,
    pub risk_level: Option<RiskLevel>,
}

async fn send_market_symbol(
    State(state): State<AppState>,
    body: Result<Json<SymbolRequest>, JsonRejection>,
) -> Result<Json<IngestResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let symbol = request
        .market_symbol
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("marketSymbol is required".to_string()))?;

    info!(%symbol, "Ingest requested");
    let report = state.service.ingest(symbol).await?;

    Ok(Json(IngestResponse {
        message: format!(
            "Stored {} of {} requested points for {}",
            report.points, report.requested, report.symbol
        ),
        symbol: report.symbol,
        points: report.points,
        skipped: report.skipped,
    }))
}

async fn data_algorithms(
    State(state): State<AppState>,
    Query(query): Query<AlgorithmsQuery>,
) -> Result<Json<AlgorithmsResponse>, ApiError> {
    let symbol = query.symbol.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let Some(analysis) = state.service.analyze(symbol).await? else {
        return Ok(Json(AlgorithmsResponse::default()));
    };

    let mut response = AlgorithmsResponse {
        market_trend: Some(analysis.trend),
        ..AlgorithmsResponse::default()
    };
    if let Some(risk) = analysis.risk {
        response.monthly_percent_changes = risk.monthly_percent_changes;
        response.standard_deviation = Some(risk.standard_deviation);
        response.risk_level = Some(risk.risk_level);
    }

    Ok(Json(response))
}

async fn health() -> &'static str {
    "OK"
}
