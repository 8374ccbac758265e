use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::BackendResult;
use crate::file::FileBackend;
use crate::memory::InMemoryBackend;
use crate::traits::KvBackend;

/// Which backend to open.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Process-local memory; nothing survives a restart.
    #[default]
    Memory,
    /// One file per key under `path`.
    File { path: PathBuf },
}

/// Open the backend described by `config`.
pub fn open_backend(config: &BackendConfig) -> BackendResult<Arc<dyn KvBackend>> {
    let backend: Arc<dyn KvBackend> = match config {
        BackendConfig::Memory => Arc::new(InMemoryBackend::new()),
        BackendConfig::File { path } => Arc::new(FileBackend::open(path.clone())?),
    };
    tracing::info!(backend = backend.name(), "storage backend ready");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_memory() {
        assert_eq!(BackendConfig::default(), BackendConfig::Memory);
        let b = open_backend(&BackendConfig::default()).unwrap();
        assert_eq!(b.name(), "memory");
    }

    #[test]
    fn opens_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = BackendConfig::File {
            path: dir.path().to_path_buf(),
        };
        let b = open_backend(&cfg).unwrap();
        assert_eq!(b.name(), "file");
        b.set("k", b"v").unwrap();
        assert!(dir.path().join("k").exists());
    }

    #[test]
    fn parses_from_toml() {
        let cfg: BackendConfig = toml::from_str("type = \"file\"\npath = \"/var/lib/ostore\"").unwrap();
        assert_eq!(
            cfg,
            BackendConfig::File {
                path: "/var/lib/ostore".into()
            }
        );
        let cfg: BackendConfig = toml::from_str("type = \"memory\"").unwrap();
        assert_eq!(cfg, BackendConfig::Memory);
    }

    #[test]
    fn unknown_type_rejected() {
        assert!(toml::from_str::<BackendConfig>("type = \"redis\"").is_err());
    }
}
