use thiserror::Error;

/// Errors from parsing or evaluating a query.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    /// The query text is malformed.
    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// The query is well-formed but cannot be evaluated against an object.
    #[error("evaluation error: {0}")]
    Evaluation(String),
}

impl QueryError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}

/// Result alias for query operations.
pub type QueryResult<T> = Result<T, QueryError>;
