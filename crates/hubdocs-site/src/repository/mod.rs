//! Index-backed page repository.
//!
//! [`IndexRepository`] owns four indexes scoped by a prefix:
//!
//! | Index | Documents | Id |
//! |---|---|---|
//! | `{prefix}-pages` | [`Page`] | page path |
//! | `{prefix}-sections` | one per section | `{path}#{slug}` |
//! | `{prefix}-headings` | one per heading | `{path}#{slug}` |
//! | `{prefix}-static` | `hashes` and `roles` snapshots | fixed |
//!
//! # Caching
//!
//! Page lookups, the main navigation tree and the effective-roles snapshot
//! are memoized in a [`Cache`]. The cache is only ever invalidated as a
//! whole, once, after a sync has written both snapshots. A lookup stores its
//! result only if no invalidation happened since it started reading, so a
//! read that raced a sync cannot reinstate the previous snapshot.
//!
//! # Example
//!
//! ```ignore
//! let repository = IndexRepository::new(client, source, Arc::new(MemoryCache::new()), config);
//! let report = repository.sync()?;
//! let toc = repository.main_toc()?;
//! ```

mod schema;
mod sync;

use std::sync::{Arc, Mutex};

use hubdocs_cache::{Cache, CacheBucket, CacheBucketExt};
use hubdocs_index::{IndexClient, IndexError, RetryPolicy};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SiteError;
use crate::model::{NAVIGATION_PAGE, Page, RoleSet, RolesByPath, Toc};
use crate::search::{SearchPages, SearchSource};
use crate::source::ContentSource;

pub use sync::SyncReport;

/// Id of the content hash snapshot in the static index.
pub const HASHES_DOC: &str = "hashes";

/// Id of the effective-roles snapshot in the static index.
pub const ROLES_DOC: &str = "roles";

const MAIN_TOC_KEY: &str = "main";
const ROLES_KEY: &str = "effective";

/// Index names derived from a prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexNames {
    /// Page documents.
    pub pages: String,
    /// Section documents.
    pub sections: String,
    /// Heading documents.
    pub headings: String,
    /// Snapshot documents.
    pub static_data: String,
}

impl IndexNames {
    /// Derive names from `prefix`.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            pages: format!("{prefix}-pages"),
            sections: format!("{prefix}-sections"),
            headings: format!("{prefix}-headings"),
            static_data: format!("{prefix}-static"),
        }
    }
}

/// Configuration for [`IndexRepository`].
#[derive(Clone, Debug)]
pub struct RepositoryConfig {
    /// Prefix of every index name.
    pub prefix: String,
    /// Hits per search page.
    pub search_page_size: usize,
    /// Documents per bulk request during sync.
    pub bulk_chunk_size: usize,
    /// Retry applied to every index call made by sync.
    pub write_retry: RetryPolicy,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            prefix: "hubdocs".to_owned(),
            search_page_size: 20,
            bulk_chunk_size: 20,
            write_retry: RetryPolicy::default(),
        }
    }
}

/// Pages, navigation and role snapshots stored in a search index.
///
/// # Thread Safety
///
/// Reads take no locks beyond the cache's own. [`sync`](Self::sync) holds an
/// internal mutex so concurrent callers run one after the other.
pub struct IndexRepository {
    client: Arc<dyn IndexClient>,
    source: Arc<dyn ContentSource>,
    cache: Arc<dyn Cache>,
    pages_cache: Box<dyn CacheBucket>,
    navigation_cache: Box<dyn CacheBucket>,
    roles_cache: Box<dyn CacheBucket>,
    names: IndexNames,
    search_page_size: usize,
    bulk_chunk_size: usize,
    write_retry: RetryPolicy,
    sync_lock: Mutex<()>,
}

impl IndexRepository {
    /// Create a repository.
    ///
    /// # Arguments
    ///
    /// * `client` - Index backend
    /// * `source` - Post-processor output, read during sync
    /// * `cache` - Read-through cache for lookups
    /// * `config` - Index prefix, page and chunk sizes, retry policy
    #[must_use]
    pub fn new(
        client: Arc<dyn IndexClient>,
        source: Arc<dyn ContentSource>,
        cache: Arc<dyn Cache>,
        config: RepositoryConfig,
    ) -> Self {
        Self {
            pages_cache: cache.bucket("pages"),
            navigation_cache: cache.bucket("navigation"),
            roles_cache: cache.bucket("roles"),
            client,
            source,
            cache,
            names: IndexNames::new(&config.prefix),
            search_page_size: config.search_page_size.max(1),
            bulk_chunk_size: config.bulk_chunk_size.max(1),
            write_retry: config.write_retry,
            sync_lock: Mutex::new(()),
        }
    }

    /// Index names in use.
    #[must_use]
    pub fn names(&self) -> &IndexNames {
        &self.names
    }

    /// Find a page by path, with or without a leading `/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the index request fails or the stored document
    /// is malformed. A missing page is `Ok(None)`.
    pub fn find_page_by_path(&self, path: &str) -> Result<Option<Page>, SiteError> {
        let path = path.strip_prefix('/').unwrap_or(path);

        if let Some(page) = self.pages_cache.get_json::<Page>(path) {
            return Ok(Some(page));
        }

        let generation = self.cache.generation();
        let Some(body) = self.client.get_document(&self.names.pages, path)? else {
            return Ok(None);
        };
        let page: Page = decode("page", body)?;
        self.pages_cache.set_json_if_current(path, &page, generation);
        Ok(Some(page))
    }

    /// First toc of the navigation page.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::SyncInProgress`] if the navigation page is not
    /// indexed or carries no toc.
    pub fn main_toc(&self) -> Result<Toc, SiteError> {
        if let Some(toc) = self.navigation_cache.get_json::<Toc>(MAIN_TOC_KEY) {
            return Ok(toc);
        }

        let generation = self.cache.generation();
        let page = self.find_page_by_path(NAVIGATION_PAGE)?.ok_or_else(|| {
            SiteError::sync_in_progress(format!("{NAVIGATION_PAGE} is not indexed"))
        })?;
        let toc = page.tocs.into_iter().next().ok_or_else(|| {
            SiteError::sync_in_progress(format!("{NAVIGATION_PAGE} contains no toc"))
        })?;

        self.navigation_cache.set_json_if_current(MAIN_TOC_KEY, &toc, generation);
        Ok(toc)
    }

    /// Effective roles of every known path.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::SyncInProgress`] if no role snapshot is indexed.
    pub fn effective_roles(&self) -> Result<RolesByPath, SiteError> {
        if let Some(roles) = self.roles_cache.get_json::<RolesByPath>(ROLES_KEY) {
            return Ok(roles);
        }

        let generation = self.cache.generation();
        let body = self
            .client
            .get_document(&self.names.static_data, ROLES_DOC)?
            .ok_or_else(|| SiteError::sync_in_progress("role snapshot is not indexed"))?;
        let roles: RolesByPath = decode("roles snapshot", body)?;

        self.roles_cache.set_json_if_current(ROLES_KEY, &roles, generation);
        Ok(roles)
    }

    /// Effective roles of one path; unknown paths are public.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::SyncInProgress`] if no role snapshot is indexed.
    pub fn path_roles(&self, path: &str) -> Result<RoleSet, SiteError> {
        let path = path.strip_prefix('/').unwrap_or(path);
        Ok(self.effective_roles()?.remove(path).unwrap_or_default())
    }

    /// Lazily paginated heading matches, unfiltered.
    #[must_use]
    pub fn search_headings(&self, query: &str) -> SearchPages<'_> {
        SearchPages::new(
            self.client.as_ref(),
            &self.names.headings,
            SearchSource::Headings,
            query,
            self.search_page_size,
        )
    }

    /// Lazily paginated section matches, unfiltered.
    #[must_use]
    pub fn search_sections(&self, query: &str) -> SearchPages<'_> {
        SearchPages::new(
            self.client.as_ref(),
            &self.names.sections,
            SearchSource::Sections,
            query,
            self.search_page_size,
        )
    }

    /// Drop every memoized lookup.
    pub fn clear_cache(&self) {
        self.cache.invalidate();
    }

    /// Run an index call under the write retry policy.
    fn with_retry<T>(
        &self,
        operation: &str,
        f: impl FnMut() -> Result<T, IndexError>,
    ) -> Result<T, SiteError> {
        self.write_retry
            .run(operation, f)
            .map_err(|e| SiteError::Index(e.into()))
    }
}

/// Decode a stored document.
pub(crate) fn decode<T: DeserializeOwned>(kind: &'static str, body: Value) -> Result<T, SiteError> {
    serde_json::from_value(body).map_err(|source| SiteError::Malformed { kind, source })
}
