//! Reelbranch API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reelbranch_core::error::NarrativeError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The story backend client could not be built.
    #[error("gateway error: {0}")]
    Gateway(#[from] NarrativeError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// A failed session operation.
    Narrative(NarrativeError),
    /// The session lock was poisoned by a panicking handler.
    SessionPoisoned(String),
}

impl From<NarrativeError> for ApiError {
    fn from(err: NarrativeError) -> Self {
        Self::Narrative(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Self::Narrative(err) => {
                let status = match err {
                    NarrativeError::StoryNotFound(_) | NarrativeError::NodeNotFound(_) => {
                        StatusCode::NOT_FOUND
                    }
                    NarrativeError::NoActiveStory => StatusCode::CONFLICT,
                    NarrativeError::MalformedTree { .. } => StatusCode::BAD_GATEWAY,
                    NarrativeError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, err.code(), err.to_string())
            }
            Self::SessionPoisoned(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "session_poisoned",
                format!("session state poisoned: {msg}"),
            ),
        };

        let body = ErrorBody {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}
