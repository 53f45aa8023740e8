//! HTTP error types for the `splitpage` server.
//!
//! Maps domain errors from `splitpage-core` into HTTP responses. Every error
//! produces a JSON body of the form `{"error": "<message>"}`, which is the
//! shape analytics clients expect from the collector.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

use splitpage_core::error::{EventError, SinkError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Requested resource not found (including unknown variant pages).
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// Internal server error.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, axum::Json(ErrorBody { error: message })).into_response()
    }
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        debug!(reason = %err, "rejected analytics payload");
        Self::BadRequest("Invalid event data".to_owned())
    }
}

impl From<SinkError> for AppError {
    fn from(err: SinkError) -> Self {
        error!(error = %err, "analytics event could not be recorded");
        Self::Internal("Internal server error".to_owned())
    }
}
