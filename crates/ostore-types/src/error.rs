use thiserror::Error;

/// Errors produced by type conversions at the wire boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid value for field {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("invalid timestamp for field {field}: {value}")]
    InvalidTimestamp { field: String, value: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}
