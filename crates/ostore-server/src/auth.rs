use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use ostore_client::{Client, ClientError};
use ostore_types::{sanitize_username, User};

use crate::error::ServerResult;
use crate::handler::blocking;
use crate::state::AppState;

/// How a request identifies its caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    Session(String),
    Anonymous,
}

impl Credentials {
    /// Pick the session key from the request, else `Authorization: Bearer`.
    ///
    /// An empty key counts as absent.
    pub fn from_request(key: Option<String>, headers: &HeaderMap) -> Self {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.trim().to_string());
        match key.or(bearer).filter(|k| !k.is_empty()) {
            Some(key) => Self::Session(key),
            None => Self::Anonymous,
        }
    }
}

/// Resolve credentials to the acting user.
///
/// Unknown or expired keys are rejected rather than downgraded to the
/// anonymous user.
pub async fn authenticate(state: &AppState, credentials: Credentials) -> ServerResult<User> {
    match credentials {
        Credentials::Anonymous => Ok(state.anonymous.as_ref().clone()),
        Credentials::Session(key) => {
            let client = state.client.clone();
            blocking(move || Ok(client.resolve_session(&key)?)).await
        }
    }
}

/// Load the anonymous user, creating it on first start.
///
/// It belongs to the group of the same name and has no password, so it can
/// never log in.
pub fn bootstrap_anonymous(client: &Client, name: &str) -> ServerResult<User> {
    match client.get_user_by_username(name) {
        Ok(user) => Ok(user),
        Err(ClientError::NotFound(_)) => {
            let mut user = User::new(name).with_groups([sanitize_username(name)]);
            client.set_user(&mut user)?;
            tracing::info!(username = %user.username, "created anonymous user");
            Ok(user)
        }
        Err(e) => Err(e.into()),
    }
}
