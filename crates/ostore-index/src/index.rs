//! The in-memory secondary index.
//!
//! [`SecondaryIndex`] keeps one [`IndexObject`] per uid in a `BTreeMap`, so
//! iteration order is stable. It performs no I/O; persisting snapshots is
//! the client's job.

use std::collections::BTreeMap;

use ostore_types::IndexObject;

/// Index projections of every live object, keyed by uid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SecondaryIndex {
    pub(crate) entries: BTreeMap<String, IndexObject>,
}

impl SecondaryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a list of projections. Later duplicates win.
    pub fn from_entries(entries: impl IntoIterator<Item = IndexObject>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            index.upsert(entry);
        }
        index
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, uid: &str) -> Option<&IndexObject> {
        self.entries.get(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.entries.contains_key(uid)
    }

    /// Insert or replace the projection for `entry.uid`.
    ///
    /// Returns the previous projection, if any.
    pub fn upsert(&mut self, entry: IndexObject) -> Option<IndexObject> {
        tracing::debug!(uid = %entry.uid, "index upsert");
        self.entries.insert(entry.uid.clone(), entry)
    }

    /// Drop the projection for `uid`.
    pub fn remove(&mut self, uid: &str) -> Option<IndexObject> {
        tracing::debug!(uid, "index remove");
        self.entries.remove(uid)
    }

    /// Iterate projections in uid order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexObject> {
        self.entries.values()
    }

    /// Owned copy of every projection in uid order, for serialization.
    pub fn snapshot(&self) -> Vec<IndexObject> {
        self.entries.values().cloned().collect()
    }
}
