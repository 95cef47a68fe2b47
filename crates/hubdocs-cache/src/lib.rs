//! Read-through cache layer for hubdocs.
//!
//! Readers consult named buckets before going to the search index. Buckets
//! are never expired by time: the whole cache is dropped in one step once a
//! sync has durably written its snapshot, so a reader sees either the
//! complete pre-sync state or the complete post-sync state.
//!
//! - [`Cache`]: Factory for named buckets plus full invalidation
//! - [`CacheBucket`]: Key-value store inside one bucket
//!
//! # Implementations
//!
//! - [`NullCache`] / [`NullCacheBucket`]: No-op implementations (always miss)
//! - [`MemoryCache`]: Process-local maps shared by every bucket handle
//!
//! # Example
//!
//! ```
//! use hubdocs_cache::{Cache, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let pages = cache.bucket("pages");
//! pages.set("guide.html", b"{}");
//! assert_eq!(pages.get("guide.html"), Some(b"{}".to_vec()));
//!
//! cache.invalidate();
//! assert_eq!(pages.get("guide.html"), None);
//! ```

mod ext;
mod memory;

pub use ext::CacheBucketExt;
pub use memory::MemoryCache;

/// A named partition within a [`Cache`].
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value, `None` on miss.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a value, overwriting any existing entry for the same key.
    fn set(&self, key: &str, value: &[u8]);

    /// Store a value only if the cache is still at `generation`.
    ///
    /// Returns whether the value was stored. Pass the
    /// [`Cache::generation`] observed before loading `value`.
    fn set_if_current(&self, key: &str, value: &[u8], generation: u64) -> bool;
}

/// Factory for named cache [`CacheBucket`]s.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket.
    ///
    /// Handles returned for the same name share the same entries.
    ///
    /// # Arguments
    ///
    /// * `name` - Bucket name (e.g., "pages", "roles", "navigation")
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;

    /// Counter advanced by every [`invalidate`](Self::invalidate).
    fn generation(&self) -> u64;

    /// Drop every entry in every bucket at once.
    fn invalidate(&self);
}

/// No-op [`CacheBucket`] that never stores or retrieves data.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _value: &[u8]) {}

    fn set_if_current(&self, _key: &str, _value: &[u8], _generation: u64) -> bool {
        false
    }
}

/// No-op [`Cache`] that always returns [`NullCacheBucket`]s.
///
/// Use when caching is disabled; every read goes to the index.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }

    fn generation(&self) -> u64 {
        0
    }

    fn invalidate(&self) {}
}
