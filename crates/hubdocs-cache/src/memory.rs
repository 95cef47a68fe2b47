//! In-memory cache implementation.
//!
//! All buckets of a [`MemoryCache`] live behind one lock, so
//! [`Cache::invalidate`] swaps out every bucket in a single write. Readers
//! holding a bucket handle keep working after invalidation; they simply miss
//! until the entry is loaded again.
//!
//! Each invalidation bumps a generation counter under the same lock.
//! [`CacheBucket::set_if_current`] compares against it before storing, so a
//! value loaded before an invalidation is never written back after it.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{Cache, CacheBucket};

#[derive(Default)]
struct State {
    generation: u64,
    buckets: HashMap<String, HashMap<String, Vec<u8>>>,
}

/// Process-local [`Cache`] shared by every bucket handle it hands out.
#[derive(Clone, Default)]
pub struct MemoryCache {
    state: Arc<RwLock<State>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .buckets
            .values()
            .map(HashMap::len)
            .sum()
    }

    /// Whether no bucket holds any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryCacheBucket {
            name: name.to_owned(),
            state: Arc::clone(&self.state),
        })
    }

    fn generation(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    fn invalidate(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let entries: usize = state.buckets.values().map(HashMap::len).sum();
        state.buckets.clear();
        state.generation += 1;
        tracing::debug!(entries, generation = state.generation, "cache invalidated");
    }
}

/// Handle to one named bucket of a [`MemoryCache`].
struct MemoryCacheBucket {
    name: String,
    state: Arc<RwLock<State>>,
}

impl MemoryCacheBucket {
    fn insert(&self, state: &mut State, key: &str, value: &[u8]) {
        state
            .buckets
            .entry(self.name.clone())
            .or_default()
            .insert(key.to_owned(), value.to_vec());
    }
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .buckets
            .get(&self.name)?
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &[u8]) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.insert(&mut state, key, value);
    }

    fn set_if_current(&self, key: &str, value: &[u8], generation: u64) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.generation != generation {
            return false;
        }
        self.insert(&mut state, key, value);
        true
    }
}
