//! Fixtures shared by the crate's tests.

use std::sync::Arc;
use std::time::Duration;

use hubdocs_cache::MemoryCache;
use hubdocs_index::{MemoryIndex, RetryPolicy};

use crate::model::{HeadingEntry, Page, PageMeta, Section};
use crate::repository::{IndexRepository, RepositoryConfig};
use crate::source::MemorySource;

/// A page with no headings.
pub(crate) fn page(path: &str, hash: &str) -> Page {
    Page {
        path: path.to_owned(),
        hash: hash.to_owned(),
        html: format!("<p>{path}</p>"),
        meta: PageMeta::default(),
        sections: Vec::new(),
        headings: Vec::new(),
        tocs: Vec::new(),
    }
}

/// A page with one level-2 heading and matching section per slug.
///
/// Titles are the slugs; section content is `"{slug} body"`.
pub(crate) fn page_with_headings(path: &str, hash: &str, slugs: &[&str]) -> Page {
    let headings: Vec<HeadingEntry> = slugs
        .iter()
        .map(|slug| HeadingEntry {
            level: 2,
            title: (*slug).to_owned(),
            slug: (*slug).to_owned(),
        })
        .collect();
    let sections = headings
        .iter()
        .map(|heading| Section {
            heading: heading.clone(),
            content: format!("{} body", heading.slug),
        })
        .collect();

    Page {
        headings,
        sections,
        ..page(path, hash)
    }
}

/// Repository with prefix `test` over an in-memory index and a
/// non-sleeping three-attempt retry.
pub(crate) fn repository(source: MemorySource) -> (Arc<MemoryIndex>, IndexRepository) {
    repository_over(Arc::new(source))
}

/// Like [`repository`], keeping a handle on the source for mutation.
pub(crate) fn repository_over(source: Arc<MemorySource>) -> (Arc<MemoryIndex>, IndexRepository) {
    let index = Arc::new(MemoryIndex::new());
    let repository = IndexRepository::new(
        index.clone(),
        source,
        Arc::new(MemoryCache::new()),
        RepositoryConfig {
            prefix: "test".to_owned(),
            search_page_size: 2,
            bulk_chunk_size: 20,
            write_retry: RetryPolicy::new(3, Duration::ZERO),
        },
    );
    (index, repository)
}
