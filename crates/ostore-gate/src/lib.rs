//! Permission engine for ostore.
//!
//! Every object operation is authorized against the acting user's groups.
//! A group holds one [`Rule`] per [`Action`]: a plain allow/deny flag or a
//! query predicate matched against the object's index projection. Authors
//! may always read their own objects, and may update them when they hold
//! create permission.
//!
//! # Key Types
//!
//! - [`PermissionEngine`] -- Group configuration plus compiled-predicate cache
//! - [`UserGroup`] -- Per-action rules for one group
//! - [`Decision`] -- Allow or deny with a reason

pub mod engine;
pub mod error;
pub mod group;

pub use engine::{Decision, PermissionEngine};
pub use error::{GateError, GateResult};
pub use group::{Action, Rule, UserGroup};
