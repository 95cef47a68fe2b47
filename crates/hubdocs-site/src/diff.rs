//! Hash-based change detection between two content snapshots.

use std::collections::BTreeSet;

use crate::model::HashByPath;

/// Classification of every path across an old and a new snapshot.
///
/// The four sets are pairwise disjoint, and `deleted ∪ updated ∪ unchanged`
/// covers exactly the old keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentDiff {
    /// In the new snapshot only.
    pub added: BTreeSet<String>,
    /// In both, with a different hash.
    pub updated: BTreeSet<String>,
    /// In the old snapshot only.
    pub deleted: BTreeSet<String>,
    /// In both, with the same hash.
    pub unchanged: BTreeSet<String>,
}

impl ContentDiff {
    /// Compare two snapshots.
    #[must_use]
    pub fn compute(old: &HashByPath, new: &HashByPath) -> Self {
        let mut diff = Self::default();

        for (path, old_hash) in old {
            match new.get(path) {
                None => diff.deleted.insert(path.clone()),
                Some(new_hash) if new_hash != old_hash => diff.updated.insert(path.clone()),
                Some(_) => diff.unchanged.insert(path.clone()),
            };
        }

        diff.added = new
            .keys()
            .filter(|path| !old.contains_key(*path))
            .cloned()
            .collect();

        diff
    }

    /// Paths whose content must be (re)indexed, added first.
    pub fn changed(&self) -> impl Iterator<Item = &String> {
        self.added.iter().chain(&self.updated)
    }

    /// Whether nothing needs to be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}
