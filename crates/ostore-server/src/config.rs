use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

use ostore_backend::BackendConfig;
use ostore_client::{ClientConfig, DEFAULT_SESSION_TIMEOUT};
use ostore_gate::{PermissionEngine, UserGroup};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// HTTP listener settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Username (and group) requests without a session key act as.
    pub anonymous_user: String,
    /// Reconcile the index with the backend after every write.
    pub sync_on_write: bool,
    /// Answer cross-origin requests from any origin.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8081)),
            anonymous_user: "anonymous".into(),
            sync_on_write: true,
            cors: false,
        }
    }
}

/// The whole configuration file.
///
/// ```toml
/// [http]
/// bind_addr = "0.0.0.0:8081"
///
/// [storage]
/// type = "file"
/// path = "/var/lib/ostore"
///
/// [user_groups.anonymous]
/// get = "public = true"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: ServerConfig,
    pub storage: BackendConfig,
    pub user_groups: BTreeMap<String, UserGroup>,
    pub session_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: ServerConfig::default(),
            storage: BackendConfig::default(),
            user_groups: BTreeMap::new(),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Read a TOML configuration file. A missing file yields the defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse a TOML document and compile every group predicate.
    pub fn parse(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        PermissionEngine::new(config.user_groups.clone())
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(config)
    }

    /// The part of the configuration the object store needs.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            storage: self.storage.clone(),
            user_groups: self.user_groups.clone(),
            session_timeout_secs: self.session_timeout_secs,
            ..ClientConfig::default()
        }
    }
}
