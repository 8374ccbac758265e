use std::sync::Arc;

use ostore_client::Client;
use ostore_types::User;

use crate::auth::bootstrap_anonymous;
use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub client: Arc<Client>,
    pub config: Arc<ServerConfig>,
    pub anonymous: Arc<User>,
}

impl AppState {
    /// Wrap a client, making sure the anonymous user exists.
    pub fn new(client: Arc<Client>, config: ServerConfig) -> ServerResult<Self> {
        let anonymous = bootstrap_anonymous(&client, &config.anonymous_user)?;
        Ok(Self {
            client,
            config: Arc::new(config),
            anonymous: Arc::new(anonymous),
        })
    }
}
