//! Embeddable object store client.
//!
//! [`Client`] is the single entry point: it owns the storage backend, the
//! secondary index, the permission engine and the session list, and is
//! shared by reference (`Arc<Client>`) between callers.
//!
//! ```no_run
//! use ostore_client::Client;
//! use ostore_types::Object;
//!
//! let client = Client::in_memory();
//! let mut object = Object::default().field("title", "hello");
//! client.set(&mut object, None)?;
//! let found = client.query("title = 'hel*'", None)?;
//! assert_eq!(found.len(), 1);
//! # Ok::<(), ostore_client::ClientError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod users;

pub use client::{Client, INDEX_KEY, OBJECT_PREFIX, USERNAME_PREFIX, USER_PREFIX};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use session::{SessionManager, UserSession, DEFAULT_SESSION_TIMEOUT};
