//! Foundation types for ostore.
//!
//! Every other ostore crate depends on `ostore-types`.
//!
//! # Key Types
//!
//! - [`Value`]: Tagged scalar stored in an object's data map
//! - [`Object`]: Schemaless record with immutable identity and author
//! - [`IndexObject`]: Size-bounded projection used for queries and permissions
//! - [`User`]: Identity record with group memberships
//! - [`ApiObject`]: Flat `_`-prefixed wire shape exchanged with clients

pub mod api;
pub mod error;
pub mod object;
pub mod user;
pub mod value;

pub use api::{ApiObject, ApiRequest, ApiResponse, SessionKey};
pub use error::TypeError;
pub use object::{IndexObject, Object, INDEX_VALUE_MAX_SIZE};
pub use user::{sanitize_username, User};
pub use value::Value;
