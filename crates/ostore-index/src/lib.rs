//! Secondary index for ostore.
//!
//! Holds the index projection of every live object, keyed by uid, and
//! reconciles it with a serialized copy kept in the backend.
//!
//! # Key Types
//!
//! - [`SecondaryIndex`] -- The in-memory index (BTreeMap-backed)
//! - [`MergeOutcome`] -- What a reconciliation with a remote copy changed

pub mod index;
pub mod merge;

pub use index::SecondaryIndex;
pub use merge::MergeOutcome;
