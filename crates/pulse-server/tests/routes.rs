use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Datelike, NaiveDate};
use pulse_analytics::{
    AnalyticsConfig, AnalyticsError, AnalyticsService, FixedClock, MarketDataProvider, MemoryStore,
    ProviderReply, RawPoint, Result, RetryPolicy,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

/// Replies by symbol: AAPL rises month over month, the rest fail in one way each
struct FakeProvider;

#[async_trait]
impl MarketDataProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn daily_open_close(&self, symbol: &str, date: NaiveDate) -> Result<ProviderReply> {
        match symbol {
            "AAPL" => {
                let base = 100.0 + f64::from(date.month());
                Ok(ProviderReply::Success(RawPoint::new(
                    symbol,
                    date,
                    base,
                    base + 0.5,
                )))
            }
            "ZZZZ" => Ok(ProviderReply::SymbolNotFound),
            "BUSY" => Ok(ProviderReply::RateLimited),
            "DOWN" => Err(AnalyticsError::ProviderUnreachable(
                "connection refused".to_string(),
            )),
            _ => Ok(ProviderReply::NoDataForDate),
        }
    }
}

fn app() -> Router {
    let config = AnalyticsConfig::builder()
        .months(3)
        .retry_policy(RetryPolicy::no_retry())
        .build()
        .unwrap();
    let service = AnalyticsService::new(
        Arc::new(FakeProvider),
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap())),
        Arc::new(MemoryStore::new()),
        &config,
    );
    pulse_server::router(Arc::new(service))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_symbol(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/send-market-symbol")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn test_ingest_then_analyze() {
    let app = app();

    let (status, body) = send(&app, post_symbol(r#"{"marketSymbol":"aapl"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], json!("AAPL"));
    assert_eq!(body["points"], json!(3));
    assert!(body["message"].as_str().unwrap().contains("AAPL"));

    let (status, body) = send(&app, get("/data-algorithms")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marketTrend"]["trend"], json!("Increasing"));
    assert_eq!(body["marketTrend"]["firstOpen"], json!(104.0));
    assert_eq!(body["marketTrend"]["lastClose"], json!(106.5));
    assert_eq!(body["monthlyPercentChanges"].as_array().unwrap().len(), 2);
    assert_eq!(body["riskLevel"], json!("Low Risk"));
    assert!(body["standardDeviation"].is_number());

    let (status, explicit) = send(&app, get("/data-algorithms?symbol=AAPL")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(explicit, body);
}

#[tokio::test]
async fn test_analyze_before_any_ingest() {
    let (status, body) = send(&app(), get("/data-algorithms")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marketTrend"], Value::Null);
    assert_eq!(body["monthlyPercentChanges"], json!([]));
    assert_eq!(body["standardDeviation"], Value::Null);
    assert_eq!(body["riskLevel"], Value::Null);
}

#[tokio::test]
async fn test_missing_symbol_is_bad_request() {
    let app = app();

    for body in [r"{}", r#"{"marketSymbol":"   "}"#, r#"{"marketSymbol":null}"#] {
        let (status, response) = send(&app, post_symbol(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert!(response["error"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (status, body) = send(&app(), post_symbol("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_pipeline_failures_map_to_statuses() {
    let app = app();
    let cases = [
        ("ZZZZ", StatusCode::NOT_FOUND),
        ("EMPTY", StatusCode::NOT_FOUND),
        ("$$$", StatusCode::NOT_FOUND),
        ("BUSY", StatusCode::TOO_MANY_REQUESTS),
        ("DOWN", StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (symbol, expected) in cases {
        let request = post_symbol(&json!({ "marketSymbol": symbol }).to_string());
        let (status, body) = send(&app, request).await;
        assert_eq!(status, expected, "{symbol}");
        assert!(body["error"].is_string(), "{symbol}");
    }

    // Nothing was stored by the failed runs.
    let (_, body) = send(&app, get("/data-algorithms")).await;
    assert_eq!(body["marketTrend"], Value::Null);
}
