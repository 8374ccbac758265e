use thiserror::Error;

/// Errors returned by [`crate::RemoteClient`].
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced an HTTP response.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with `success: false`.
    #[error("server error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body was not an ostore envelope.
    #[error("unexpected response ({status}): {reason}")]
    Decode { status: u16, reason: String },

    /// An operation that needs a session was called before `login`.
    #[error("not logged in")]
    NotLoggedIn,

    #[error("invalid argument: {0}")]
    InvalidArg(String),
}

impl RemoteError {
    /// HTTP status the server answered with, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Decode { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
