use thiserror::Error;

/// Application-wide error types for jobscope.
#[derive(Error, Debug)]
pub enum AppError {
    /// A posting whose link cannot be turned into an absolute URL.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    /// The storage backend cannot be reached. Terminal for persistence.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Database operation failed (constraint, decoding, bad query).
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// HTTP request failed (fetching a listing page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if persistence must stop for the rest of the run.
    pub fn halts_persistence(&self) -> bool {
        matches!(self, AppError::StorageUnavailable(_))
    }
}
