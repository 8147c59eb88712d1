//! HTTP boundary for market-pulse
//!
//! Exposes the analytics pipeline over two JSON endpoints:
//!
//! - `POST /send-market-symbol` fetches and stores history for a symbol
//! - `GET /data-algorithms` analyzes the stored history
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_analytics::{AnalyticsConfig, AnalyticsService};
//! use pulse_server::router;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AnalyticsConfig::builder().with_env_api_key().build()?;
//! let service = Arc::new(AnalyticsService::from_config(&config).await?);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, router(service)).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{AppState, router};
