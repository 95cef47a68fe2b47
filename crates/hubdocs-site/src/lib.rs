//! Documentation site core for hubdocs.
//!
//! This crate keeps a search index in step with the post-processor's output
//! and answers role-aware questions about it:
//!
//! - [`IndexRepository`] syncs pages, sections and headings incrementally by
//!   content hash and serves memoized lookups
//! - [`effective_roles`] derives each page's visibility from its navigation
//!   ancestors
//! - [`AccessFilter`] trims navigation trees and search results to what a
//!   principal may see
//! - [`PageLinks`] finds a page's neighbours in the main navigation
//! - [`SearchAggregator`] merges paginated heading and section matches,
//!   stopping as soon as enough visible results are collected
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hubdocs_cache::MemoryCache;
//! use hubdocs_index::HttpIndexClient;
//! use hubdocs_site::{FsContentSource, IndexRepository, RepositoryConfig, SearchAggregator};
//!
//! let repository = IndexRepository::new(
//!     Arc::new(HttpIndexClient::new("http://localhost:9200", None, timeout)),
//!     Arc::new(FsContentSource::new("build")),
//!     Arc::new(MemoryCache::new()),
//!     RepositoryConfig::default(),
//! );
//! repository.sync()?;
//! let hits = SearchAggregator::new(&repository).search("install", 10, &roles)?;
//! ```

mod access;
mod diff;
mod error;
mod href;
mod links;
mod model;
mod repository;
mod roles;
mod search;
mod source;
#[cfg(test)]
mod testing;

pub use access::{AccessFilter, can_see};
pub use diff::ContentDiff;
pub use error::{SYNC_IN_PROGRESS, SiteError};
pub use href::{is_external, normalize_path, resolve_href};
pub use links::PageLinks;
pub use model::{
    HashByPath, HeadingEntry, NAVIGATION_PAGE, Page, PageMeta, Role, RoleSet, RolesByPath,
    SearchResult, Section, Toc, TocEntry, UnknownRole, parse_role_list,
};
pub use repository::{
    HASHES_DOC, IndexNames, IndexRepository, ROLES_DOC, RepositoryConfig, SyncReport,
};
pub use roles::{effective_roles, effective_roles_for};
pub use search::{SearchAggregator, SearchPages, SearchSource};
#[cfg(any(test, feature = "mock"))]
pub use source::MemorySource;
pub use source::{ContentSource, FsContentSource, HASHES_FILE, ROLES_FILE, SourceError};
