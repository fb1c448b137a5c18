//! HTTP mapping for engine errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scorecard::ScorecardError;
use serde::Serialize;
use tracing::error;

/// Error body returned alongside non-2xx statuses. The 404 contract does not
/// require a body; this one exists for humans reading responses by hand.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request-scoped error. Validation failures and missing data both surface
/// as 404; everything else is a 500.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "not found".to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ScorecardError> for ApiError {
    fn from(err: ScorecardError) -> Self {
        match err {
            ScorecardError::NotFound => Self::not_found(),
            ScorecardError::Store(e) => {
                error!("store error during request: {e}");
                Self::internal("internal error")
            }
            ScorecardError::Startup { reason } => {
                // Cannot happen after startup, but keep the mapping total.
                error!("startup error surfaced during request: {reason}");
                Self::internal("internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
