//! Declared index mappings and destructive migration.
//!
//! Mappings are never migrated in place: once any content index's live
//! `properties` differ from the declaration, every content index is deleted
//! and recreated, and the static snapshots are discarded so the next diff
//! reindexes everything from an empty state.

use serde_json::{Value, json};

use super::IndexRepository;
use crate::error::SiteError;

/// Pages are stored whole; only identity fields are indexed.
pub(crate) fn pages_mapping() -> Value {
    json!({
        "dynamic": false,
        "properties": {
            "path": { "type": "keyword" },
            "hash": { "type": "keyword" },
            "html": { "type": "text", "index": false }
        }
    })
}

pub(crate) fn sections_mapping() -> Value {
    json!({
        "dynamic": false,
        "properties": {
            "path": { "type": "keyword" },
            "heading": {
                "properties": {
                    "title": { "type": "text" },
                    "slug": { "type": "keyword" },
                    "level": { "type": "integer" }
                }
            },
            "content": { "type": "text" }
        }
    })
}

pub(crate) fn headings_mapping() -> Value {
    json!({
        "dynamic": false,
        "properties": {
            "path": { "type": "keyword" },
            "title": { "type": "text" },
            "slug": { "type": "keyword" },
            "level": { "type": "integer" }
        }
    })
}

/// Snapshot keys are page paths, which contain dots, so nothing is mapped.
pub(crate) fn static_mapping() -> Value {
    json!({ "enabled": false })
}

/// Compare `properties` only; engines echo other settings back in their
/// own representation (`"dynamic": "false"`).
pub(crate) fn mapping_matches(declared: &Value, live: &Value) -> bool {
    declared.get("properties") == live.get("properties")
}

impl IndexRepository {
    /// Bring every index in line with its declaration.
    ///
    /// If any content index is missing or its mapping differs, all three
    /// content indexes are recreated and the static index is discarded, so
    /// the following diff rebuilds everything and no page that left the
    /// source survives in an index that kept its mapping.
    ///
    /// Returns whether the content indexes were recreated.
    pub(crate) fn migrate_schemas(&self) -> Result<bool, SiteError> {
        let declared = [
            (&self.names.pages, pages_mapping()),
            (&self.names.sections, sections_mapping()),
            (&self.names.headings, headings_mapping()),
        ];

        let mut stale = Vec::new();
        for (index, mapping) in &declared {
            if !self.mapping_is_current(index, mapping)? {
                stale.push(index.as_str());
            }
        }

        let recreated = !stale.is_empty();
        let static_index = &self.names.static_data;
        if recreated {
            tracing::info!(stale = ?stale, "Schema changed, recreating content indexes");
            for (index, mapping) in &declared {
                self.recreate_index(index, mapping)?;
            }
            tracing::info!(index = %static_index, "Discarding snapshots");
            self.with_retry(&format!("delete index {static_index}"), || {
                self.client.delete_index(static_index)
            })?;
        }

        let exists = self
            .with_retry(&format!("read mapping of {static_index}"), || {
                self.client.mapping(static_index)
            })?
            .is_some();
        if !exists {
            tracing::info!(index = %static_index, "Creating index");
            self.with_retry(&format!("create index {static_index}"), || {
                self.client.create_index(static_index, &static_mapping())
            })?;
        }

        Ok(recreated)
    }

    /// Whether `index` exists with the declared mapping.
    fn mapping_is_current(&self, index: &str, declared: &Value) -> Result<bool, SiteError> {
        let live = self.with_retry(&format!("read mapping of {index}"), || {
            self.client.mapping(index)
        })?;
        Ok(live.is_some_and(|live| mapping_matches(declared, &live)))
    }

    /// Drop `index` if present and create it empty with `declared`.
    fn recreate_index(&self, index: &str, declared: &Value) -> Result<(), SiteError> {
        self.with_retry(&format!("delete index {index}"), || {
            self.client.delete_index(index)
        })?;
        self.with_retry(&format!("create index {index}"), || {
            self.client.create_index(index, declared)
        })
    }
}
