use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{BackendError, BackendResult};
use crate::traits::KvBackend;

/// In-memory, HashMap-based backend.
///
/// Intended for tests and embedding. Data is lost when the backend is
/// dropped.
pub struct InMemoryBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted list of stored keys beginning with `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> BackendResult<Vec<String>> {
        let map = self.entries.read().map_err(poisoned)?;
        let mut keys: Vec<String> = map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> BackendError {
    BackendError::Unavailable(format!("lock poisoned: {e}"))
}

impl KvBackend for InMemoryBackend {
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> BackendResult<()> {
        let mut map = self.entries.write().map_err(poisoned)?;
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> BackendResult<bool> {
        let mut map = self.entries.write().map_err(poisoned)?;
        Ok(map.remove(key).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("key_count", &self.len())
            .finish()
    }
}
