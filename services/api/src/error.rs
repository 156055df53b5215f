//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto HTTP responses. Every non-2xx response carries a `{"detail": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;
use docchat_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed or missing input that never reached a component.
    #[error("{0}")]
    Validation(String),

    /// A missing, malformed, unknown, or expired bearer token.
    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The vector store or the generation provider failed. The payload is
    /// internal detail and is logged, never sent to the client.
    #[error("Upstream dependency failed")]
    Dependency(String),

    /// A bounded call to an external service did not finish in time.
    #[error("Upstream call timed out")]
    Timeout(String),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<PortError> for ApiError {
    fn from(e: PortError) -> Self {
        match e {
            PortError::InvalidInput(msg) => ApiError::Validation(msg),
            PortError::NotFound(msg) => ApiError::NotFound(msg),
            PortError::Conflict(msg) => ApiError::Conflict(msg),
            PortError::Dependency(msg) => ApiError::Dependency(msg),
            PortError::Timeout(msg) => ApiError::Timeout(msg),
            PortError::Unexpected(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Dependency(internal) => {
                error!("Upstream dependency failure: {internal}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream dependency failed".to_string(),
                )
            }
            ApiError::Timeout(internal) => {
                error!("Upstream call timed out: {internal}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "Upstream call timed out".to_string(),
                )
            }
            other => {
                error!("Internal error: {other}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
