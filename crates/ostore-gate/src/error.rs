use ostore_query::QueryError;

use crate::group::Action;

/// Errors that can occur during permission evaluation.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// A group's predicate does not parse.
    #[error("invalid {action} rule in group '{group}': {source}")]
    InvalidRule {
        group: String,
        action: Action,
        source: QueryError,
    },

    /// A predicate could not be evaluated against an object.
    #[error("rule evaluation failed: {0}")]
    Evaluation(QueryError),

    /// Internal engine state is unusable.
    #[error("permission engine unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for permission checks.
pub type GateResult<T> = Result<T, GateError>;
