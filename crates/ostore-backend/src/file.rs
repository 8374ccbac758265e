use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{BackendError, BackendResult};
use crate::traits::KvBackend;

/// Directory-backed store: one file per key.
///
/// Writes land in a temporary file inside the same directory and are
/// renamed over the target, so a reader never observes a partial value.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Open (creating if needed) a backend rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> BackendResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "opened file backend");
        Ok(Self { root })
    }

    /// The directory holding the key files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> BackendResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Keys become file names, so anything that could escape the root or hide
/// a file is refused.
fn validate_key(key: &str) -> BackendResult<()> {
    if key.is_empty()
        || key.starts_with('.')
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0')
    {
        return Err(BackendError::InvalidKey(key.to_string()));
    }
    Ok(())
}

impl KvBackend for FileBackend {
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> BackendResult<()> {
        let path = self.path_for(key)?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(value)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> BackendResult<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
