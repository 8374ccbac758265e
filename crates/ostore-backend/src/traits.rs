use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BackendError, BackendResult};

/// Key-value storage contract.
///
/// All implementations must satisfy these invariants:
/// - `get` of a key that was never written, or was deleted, is `Ok(None)`.
/// - `set` replaces any previous value for the key.
/// - All I/O errors are propagated, never silently ignored.
pub trait KvBackend: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> BackendResult<()>;

    /// Delete `key`. Returns `true` if the key existed.
    fn delete(&self, key: &str) -> BackendResult<bool>;

    /// Short name of the backend, used in logs.
    fn name(&self) -> &'static str;
}

/// JSON helpers on top of any [`KvBackend`].
pub trait BackendExt: KvBackend {
    /// Read and deserialize the value under `key`.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> BackendResult<Option<T>> {
        match self.get(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| BackendError::Serialization {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Serialize `value` as JSON and store it under `key`.
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> BackendResult<()> {
        let bytes = serde_json::to_vec(value).map_err(|e| BackendError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.set(key, &bytes)
    }
}

impl<B: KvBackend + ?Sized> BackendExt for B {}
