//! Error types for filedrop.

use thiserror::Error;

/// Common error type for filedrop operations.
///
/// The variants map onto the service's HTTP-facing taxonomy: `InvalidInput`
/// surfaces as 4xx, `NotFound` as 404, everything else as 5xx. Cache failures
/// never appear here; the cache layer logs and swallows them.
#[derive(Error, Debug)]
pub enum FiledropError {
    /// Malformed request, stream, or name. User-correctable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Record absent, not owned by the requester, or expired.
    ///
    /// These cases are deliberately conflated so that a response never
    /// confirms the existence of another user's file.
    #[error("{0} not found")]
    NotFound(String),

    /// A storage, cache, or metadata dependency is unreachable.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Local write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata store error.
    #[error("database error: {0}")]
    Database(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FiledropError {
    fn from(e: sqlx::Error) -> Self {
        FiledropError::Database(e.to_string())
    }
}

/// Result type alias for filedrop operations.
pub type Result<T> = std::result::Result<T, FiledropError>;
