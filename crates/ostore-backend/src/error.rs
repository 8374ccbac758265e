/// Errors from key-value backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The key cannot be represented by this backend.
    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    /// Serialization or deserialization failure.
    #[error("serialization error for {key}: {reason}")]
    Serialization { key: String, reason: String },

    /// I/O error from the underlying storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend state became unusable (e.g. a poisoned lock).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
