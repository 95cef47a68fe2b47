//! Incremental sync of the content source into the indexes.

use std::sync::PoisonError;

use hubdocs_index::{IndexDocument, IndexError};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{HASHES_DOC, IndexRepository, ROLES_DOC, decode};
use crate::diff::ContentDiff;
use crate::error::SiteError;
use crate::model::{HashByPath, HeadingDocument, NAVIGATION_PAGE, Page, SectionDocument, Toc};
use crate::roles::effective_roles;

/// Outcome of one sync.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Pages indexed for the first time.
    pub added: usize,
    /// Pages reindexed because their hash changed.
    pub updated: usize,
    /// Pages removed from the indexes.
    pub deleted: usize,
    /// Whether a mapping change forced a full reindex.
    pub schema_recreated: bool,
}

impl IndexRepository {
    /// Bring the indexes in line with the content source.
    ///
    /// Steps, in order:
    /// 1. If any content index is missing or its mapping differs, recreate
    ///    all of them empty and discard the static snapshots.
    /// 2. Diff the stored hash snapshot against the source.
    /// 3. Remove deleted pages and their sections and headings.
    /// 4. Index added and updated pages in bulk chunks.
    /// 5. Write the effective-roles snapshot, then the hash snapshot.
    /// 6. Invalidate all caches.
    ///
    /// Every index call is retried under the configured policy. A failure
    /// aborts the sync before the snapshots are written, so rerunning it
    /// redoes the remaining work.
    ///
    /// # Errors
    ///
    /// Returns an error if the content source cannot be read or an index
    /// call exhausts its retries.
    pub fn sync(&self) -> Result<SyncReport, SiteError> {
        let _guard = self.sync_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let schema_recreated = self.migrate_schemas()?;

        let old_hashes: HashByPath = self.read_snapshot(HASHES_DOC)?.unwrap_or_default();
        let new_hashes = self.source.hashes()?;
        let diff = ContentDiff::compute(&old_hashes, &new_hashes);

        for path in &diff.deleted {
            tracing::info!(path = %path, "Deleting page");
            self.remove_page(path)?;
        }

        for path in &diff.updated {
            self.remove_derived(path)?;
        }

        let mut pages = BulkBatch::new(self, &self.names.pages);
        let mut sections = BulkBatch::new(self, &self.names.sections);
        let mut headings = BulkBatch::new(self, &self.names.headings);
        for path in diff.changed() {
            tracing::info!(path = %path, "Indexing page");
            let mut page = self.source.page(path)?;
            if page.path != *path {
                tracing::warn!(path = %path, declared = %page.path, "Page path differs from its key");
                page.path.clone_from(path);
            }

            for section in &page.sections {
                let doc = SectionDocument {
                    path: page.path.clone(),
                    heading: section.heading.clone(),
                    content: section.content.clone(),
                };
                sections.push(IndexDocument::new(
                    format!("{}#{}", page.path, section.heading.slug),
                    serde_json::to_value(doc).map_err(IndexError::from)?,
                ))?;
            }
            for heading in &page.headings {
                let doc = HeadingDocument {
                    path: page.path.clone(),
                    heading: heading.clone(),
                };
                headings.push(IndexDocument::new(
                    format!("{}#{}", page.path, heading.slug),
                    serde_json::to_value(doc).map_err(IndexError::from)?,
                ))?;
            }
            pages.push(IndexDocument::new(
                page.path.clone(),
                serde_json::to_value(&page).map_err(IndexError::from)?,
            ))?;
        }
        pages.flush()?;
        sections.flush()?;
        headings.flush()?;

        let raw_roles = self.source.roles()?;
        let navigation = self.source_navigation(&new_hashes)?;
        let roles = effective_roles(&navigation, &raw_roles);

        self.write_snapshot(ROLES_DOC, &roles)?;
        self.write_snapshot(HASHES_DOC, &new_hashes)?;
        self.clear_cache();

        let report = SyncReport {
            added: diff.added.len(),
            updated: diff.updated.len(),
            deleted: diff.deleted.len(),
            schema_recreated,
        };
        tracing::info!(
            added = report.added,
            updated = report.updated,
            deleted = report.deleted,
            schema_recreated = report.schema_recreated,
            "Sync done"
        );
        Ok(report)
    }

    /// Remove a page document and everything derived from it.
    fn remove_page(&self, path: &str) -> Result<(), SiteError> {
        let pages = &self.names.pages;
        self.with_retry(&format!("delete {path} from {pages}"), || {
            self.client.delete_document(pages, path)
        })?;
        self.remove_derived(path)
    }

    /// Remove the section and heading documents of a page.
    fn remove_derived(&self, path: &str) -> Result<(), SiteError> {
        for index in [&self.names.sections, &self.names.headings] {
            self.with_retry(&format!("delete {path} from {index}"), || {
                self.client.delete_by_query(index, "path", path)
            })?;
        }
        Ok(())
    }

    /// Main navigation tree as currently published by the source.
    fn source_navigation(&self, hashes: &HashByPath) -> Result<Toc, SiteError> {
        if !hashes.contains_key(NAVIGATION_PAGE) {
            tracing::warn!(
                page = NAVIGATION_PAGE,
                "Navigation page missing from content, roles are not inherited"
            );
            return Ok(Toc::new());
        }

        let page: Page = self.source.page(NAVIGATION_PAGE)?;
        Ok(page.tocs.into_iter().next().unwrap_or_default())
    }

    fn read_snapshot<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, SiteError> {
        let index = &self.names.static_data;
        let body = self.with_retry(&format!("read {id} snapshot"), || {
            self.client.get_document(index, id)
        })?;
        body.map(|body| decode("snapshot", body)).transpose()
    }

    fn write_snapshot<T: Serialize>(&self, id: &str, value: &T) -> Result<(), SiteError> {
        let index = &self.names.static_data;
        let body = serde_json::to_value(value).map_err(IndexError::from)?;
        tracing::debug!(id, "Writing snapshot");
        self.with_retry(&format!("write {id} snapshot"), || {
            self.client.put_document(index, id, &body)
        })
    }
}

/// Pending bulk writes to one index, flushed every `bulk_chunk_size` documents.
struct BulkBatch<'a> {
    repository: &'a IndexRepository,
    index: &'a str,
    pending: Vec<IndexDocument>,
}

impl<'a> BulkBatch<'a> {
    fn new(repository: &'a IndexRepository, index: &'a str) -> Self {
        Self {
            repository,
            index,
            pending: Vec::with_capacity(repository.bulk_chunk_size),
        }
    }

    fn push(&mut self, document: IndexDocument) -> Result<(), SiteError> {
        self.pending.push(document);
        if self.pending.len() >= self.repository.bulk_chunk_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SiteError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let documents = std::mem::take(&mut self.pending);
        let (repository, index) = (self.repository, self.index);
        repository.with_retry(&format!("bulk upsert into {index}"), || {
            repository.client.bulk_upsert(index, &documents)
        })
    }
}
