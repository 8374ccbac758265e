//! Key-value storage backends for ostore.
//!
//! The object store never talks to storage directly; it goes through the
//! narrow [`KvBackend`] contract of `get`, `set` and `delete` on opaque byte
//! values. Callers namespace their keys with fixed prefixes.
//!
//! # Storage Backends
//!
//! - [`InMemoryBackend`] -- `HashMap`-based backend for tests and embedding
//! - [`FileBackend`] -- one file per key inside a directory
//!
//! [`open_backend`] selects one from a [`BackendConfig`].
//!
//! # Design Rules
//!
//! 1. A missing key is `Ok(None)`, never an error.
//! 2. The backend never interprets values -- it is a pure key-value store.
//! 3. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use config::{open_backend, BackendConfig};
pub use error::{BackendError, BackendResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
pub use traits::{BackendExt, KvBackend};
