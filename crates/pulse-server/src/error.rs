//! Mapping of pipeline failures onto HTTP responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pulse_analytics::AnalyticsError;
use serde_json::json;
use tracing::error;

/// Error returned by every handler
#[derive(Debug)]
pub enum ApiError {
    /// The request itself was unusable
    BadRequest(String),
    /// The pipeline failed
    Analytics(AnalyticsError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Analytics(err) => match err {
                AnalyticsError::InvalidSymbol(_)
                | AnalyticsError::SymbolNotFound(_)
                | AnalyticsError::NoData(_) => StatusCode::NOT_FOUND,
                AnalyticsError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(message) => f.write_str(message),
            Self::Analytics(err) => write!(f, "{err}"),
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        Self::Analytics(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
