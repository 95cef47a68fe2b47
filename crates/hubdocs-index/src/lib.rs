//! Search index abstraction for hubdocs.
//!
//! This crate provides an [`IndexClient`] trait over an external document
//! search engine so the sync and search logic never speaks HTTP directly.
//! This enables:
//!
//! - **Unit testing** against an in-memory index
//! - **Backend flexibility** (Elasticsearch, `OpenSearch`, anything speaking
//!   the same REST dialect)
//! - **Uniform failure handling**: 404 on reads and deletes means "absent",
//!   everything else is an [`IndexError`]
//!
//! # Architecture
//!
//! The crate provides:
//! - [`IndexClient`] trait with index, document, bulk and search operations
//! - [`HttpIndexClient`], a blocking `ureq` implementation
//! - [`RetryPolicy`], the bounded fixed-backoff retry helper used around writes
//! - [`MemoryIndex`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use hubdocs_index::{HttpIndexClient, IndexClient, SearchRequest};
//!
//! let client = HttpIndexClient::new("http://localhost:9200", None, Duration::from_secs(30));
//! let hits = client.search("hubdocs-headings", &SearchRequest::new("install", &["title"], 0, 20))?;
//! for hit in hits {
//!     println!("{}: {}", hit.id, hit.source);
//! }
//! ```

mod client;
mod error;
mod index;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod retry;

pub use client::{BasicAuth, HttpIndexClient};
pub use error::IndexError;
pub use index::{IndexClient, IndexDocument, SearchHit, SearchRequest};
#[cfg(any(test, feature = "mock"))]
pub use mock::MemoryIndex;
pub use retry::{RetryError, RetryPolicy};
