use ostore_types::IndexObject;

use crate::index::SecondaryIndex;

/// The result of reconciling the local index with a remote copy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Entries taken over from the remote copy.
    pub adopted: usize,
    /// The local index holds state the remote copy lacks and must be
    /// written back.
    pub needs_push: bool,
}

impl SecondaryIndex {
    /// Merge a remote copy of the index into this one, last writer wins.
    ///
    /// - A remote entry also present locally replaces it only when its
    ///   `modified` is strictly newer; otherwise the local entry must be
    ///   pushed.
    /// - A remote entry missing locally is adopted and the result must be
    ///   pushed.
    /// - When no push is pending yet, any local entry missing from the
    ///   remote copy also requires one, even if newer entries were adopted.
    pub fn merge_remote(&mut self, remote: Vec<IndexObject>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        let remote_uids: Vec<String> = remote.iter().map(|e| e.uid.clone()).collect();

        for entry in remote {
            let local_modified = self.entries.get(&entry.uid).map(|local| local.modified);
            match local_modified {
                Some(modified) if entry.modified > modified => {
                    self.entries.insert(entry.uid.clone(), entry);
                    outcome.adopted += 1;
                }
                Some(_) => outcome.needs_push = true,
                None => {
                    self.entries.insert(entry.uid.clone(), entry);
                    outcome.adopted += 1;
                    outcome.needs_push = true;
                }
            }
        }

        if !outcome.needs_push {
            outcome.needs_push = self
                .entries
                .keys()
                .any(|uid| !remote_uids.iter().any(|r| r == uid));
        }

        tracing::debug!(
            adopted = outcome.adopted,
            needs_push = outcome.needs_push,
            "merged remote index"
        );
        outcome
    }
}
