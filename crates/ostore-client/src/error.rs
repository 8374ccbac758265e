use ostore_backend::BackendError;
use ostore_crypto::CryptoError;
use ostore_gate::{Action, GateError};
use ostore_query::QueryError;
use thiserror::Error;

/// Errors returned by [`crate::Client`] operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No object or user is stored under this uid or username.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request carried no object to operate on.
    #[error("missing object")]
    MissingObject,

    #[error("missing uid")]
    MissingUid,

    #[error("missing username")]
    MissingUsername,

    #[error("invalid password: {0}")]
    InvalidPassword(String),

    /// The acting user is not allowed to perform `action`.
    #[error("permission denied: cannot {action} object {uid}")]
    Permission { action: Action, uid: String },

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    /// Login failed. Deliberately does not say why.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session key is unknown or expired.
    #[error("invalid session")]
    InvalidSession,

    #[error("username already taken: {0}")]
    UsernameTaken(String),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("permission engine error: {0}")]
    Gate(#[from] GateError),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CryptoError> for ClientError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::PasswordTooShort { .. } => Self::InvalidPassword(e.to_string()),
            other => Self::Crypto(other),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
