//! Error types for flick-server
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Collaborator failures inside the worker are converted
//! to failure events, never surfaced as HTTP errors; the HTTP mapping
//! below only covers the synchronous enqueue path.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main error type for flick-server
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Job queue closed: the worker side is gone and nothing will
    /// process the job
    #[error("Job queue unavailable")]
    QueueUnavailable,

    /// Metadata provider errors
    #[error("Metadata provider error: {0}")]
    Metadata(String),

    /// AI provider errors
    #[error("AI provider error: {0}")]
    Ai(String),

    /// Embedding provider errors
    #[error("Embedding provider error: {0}")]
    Embedding(String),

    /// Rejected favorite payload
    #[error("Invalid movie: {0}")]
    InvalidMovie(String),

    /// Operation produced no usable result
    #[error("{0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::QueueUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Error::BadRequest(_) | Error::InvalidMovie(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Convenience Result type using flick-server Error
pub type Result<T> = std::result::Result<T, Error>;
