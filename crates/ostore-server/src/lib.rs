//! HTTP facade for ostore.
//!
//! Exposes login, object CRUD and queries as JSON resources over axum. A
//! request without a session key acts as the configured anonymous user.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{authenticate, bootstrap_anonymous, Credentials};
pub use config::{Config, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use router::build_router;
pub use server::OstoreServer;
pub use state::AppState;
