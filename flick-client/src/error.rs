//! Error types for flick-client

use thiserror::Error;

/// Main error type for flick-client
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level failure (connect, TLS, mid-stream read)
    #[error("Stream connection error: {0}")]
    Connect(#[from] reqwest::Error),

    /// Server closed the stream
    #[error("Stream closed by server")]
    Closed,
}

/// Convenience Result type using flick-client Error
pub type Result<T> = std::result::Result<T, Error>;
