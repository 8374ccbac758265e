use std::collections::BTreeMap;
use std::time::Duration;

use ostore_backend::BackendConfig;
use ostore_crypto::PasswordParams;
use ostore_gate::UserGroup;
use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_SESSION_TIMEOUT;

/// Everything needed to construct a [`crate::Client`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub storage: BackendConfig,
    pub user_groups: BTreeMap<String, UserGroup>,
    pub session_timeout_secs: u64,
    /// Cost parameters for new password hashes.
    #[serde(skip)]
    pub password: PasswordParams,
}

impl ClientConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            storage: BackendConfig::Memory,
            user_groups: BTreeMap::new(),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT.as_secs(),
            password: PasswordParams::default(),
        }
    }
}
