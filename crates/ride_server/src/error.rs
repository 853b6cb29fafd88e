use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ride_core::catalog::CatalogError;
use ride_core::geo::GeoError;
use ride_core::matching::MatchError;
use ride_core::routing::RouteError;
use serde_json::json;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] GeoError),

    #[error("Rider route unavailable: {0}")]
    RouteUnavailable(RouteError),

    #[error("Rider route timed out: {0}")]
    RouteTimeout(RouteError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Active rides unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) | ServerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServerError::RouteUnavailable(_) => StatusCode::BAD_GATEWAY,
            ServerError::RouteTimeout(_) | ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MatchError> for ServerError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidInput(err) => ServerError::InvalidInput(err),
            MatchError::RouteUnavailable(err @ RouteError::Timeout(_)) => ServerError::RouteTimeout(err),
            MatchError::RouteUnavailable(err) => ServerError::RouteUnavailable(err),
            MatchError::CatalogUnavailable(err) => ServerError::CatalogUnavailable(err),
        }
    }
}

impl From<RouteError> for ServerError {
    fn from(err: RouteError) -> Self {
        ServerError::Config(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
