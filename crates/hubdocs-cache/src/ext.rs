//! Extension trait for [`CacheBucket`] with typed convenience methods.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// Typed JSON access on top of the byte-oriented [`CacheBucket`].
///
/// Kept as a blanket-implemented extension so [`CacheBucket`] stays
/// object-safe and implementors only deal with raw bytes.
///
/// # Example
///
/// ```
/// use hubdocs_cache::{Cache, CacheBucketExt, MemoryCache};
///
/// let cache = MemoryCache::new();
/// let roles = cache.bucket("roles");
///
/// roles.set_json("guide.html", &vec!["admin"]);
/// let cached: Option<Vec<String>> = roles.get_json("guide.html");
/// assert_eq!(cached, Some(vec!["admin".to_owned()]));
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Retrieve a JSON-deserialized value from the cache.
    ///
    /// Returns `None` on cache miss or deserialization failure.
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get(key)?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Store a value as JSON in the cache.
    ///
    /// Silently does nothing if serialization fails.
    fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        if let Ok(bytes) = serde_json::to_vec(value) {
            self.set(key, &bytes);
        }
    }

    /// Store a value as JSON unless the cache moved past `generation`.
    ///
    /// Returns whether the value was stored.
    fn set_json_if_current<T: Serialize>(&self, key: &str, value: &T, generation: u64) -> bool {
        serde_json::to_vec(value)
            .is_ok_and(|bytes| self.set_if_current(key, &bytes, generation))
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
