//! Programmatic HTTP client for ostore.
//!
//! [`RemoteClient`] speaks the JSON envelopes of `ostore-server`
//! (`ApiRequest` in, `ApiResponse` out) and exposes login, logout and object
//! get/set/delete/query as async calls.

pub mod client;
pub mod error;

pub use client::RemoteClient;
pub use error::{RemoteError, RemoteResult};
