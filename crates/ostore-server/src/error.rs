use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use ostore_client::ClientError;
use ostore_types::{ApiResponse, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("invalid object: {0}")]
    InvalidObject(#[from] TypeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// The HTTP status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Client(e) => match e {
                ClientError::NotFound(_) => StatusCode::NOT_FOUND,
                ClientError::InvalidArg(_)
                | ClientError::InvalidQuery(_)
                | ClientError::MissingObject
                | ClientError::MissingUid
                | ClientError::MissingUsername
                | ClientError::InvalidPassword(_) => StatusCode::BAD_REQUEST,
                ClientError::Permission { .. }
                | ClientError::InvalidCredentials
                | ClientError::InvalidSession => StatusCode::UNAUTHORIZED,
                ClientError::UsernameTaken(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidObject(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            tracing::warn!(error = %self, %status, "request rejected");
            self.to_string()
        };
        (status, Json(ApiResponse::error(message))).into_response()
    }
}
