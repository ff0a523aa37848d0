//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its
//! translation into the uniform error envelope every endpoint returns:
//! `{ "success": false, "error": { "message": ..., "details": ... } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::error;

use crate::config::ConfigError;
use devstack_core::ports::PortError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

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

//=========================================================================================
// Uniform Error Envelope
//=========================================================================================

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: ErrorBody,
}

impl ApiError {
    /// The HTTP status and client-visible message/details for this error.
    ///
    /// Internal failures are reported generically; the full error is logged
    /// server-side before the response is built.
    fn into_parts(self) -> (StatusCode, String, Option<BTreeMap<String, Vec<String>>>) {
        match self {
            ApiError::Port(PortError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(errors.into_fields()),
            ),
            ApiError::Port(PortError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None)
            }
            ApiError::Port(PortError::Forbidden(message)) => {
                (StatusCode::FORBIDDEN, message, None)
            }
            ApiError::Port(PortError::NotFound(message)) => {
                (StatusCode::NOT_FOUND, message, None)
            }
            ApiError::Port(PortError::Unexpected(message)) => {
                error!("Unexpected port error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
            other => {
                error!("Internal error: {:?}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                    None,
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = self.into_parts();
        let envelope = ErrorEnvelope {
            success: false,
            error: ErrorBody { message, details },
        };
        (status, Json(envelope)).into_response()
    }
}
