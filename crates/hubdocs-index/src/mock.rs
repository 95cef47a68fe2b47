//! In-memory index implementation for testing.
//!
//! Provides [`MemoryIndex`] for unit testing without a search service.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use serde_json::Value;

use crate::error::IndexError;
use crate::index::{IndexClient, IndexDocument, SearchHit, SearchRequest};

#[derive(Debug, Default)]
struct MemIndex {
    mappings: Value,
    documents: BTreeMap<String, Value>,
}

/// In-memory [`IndexClient`] for tests.
///
/// Search is a case-insensitive substring match of the whole query against
/// the requested fields; hits come back in id order with the first match in
/// each field wrapped in `<em>`. Writing a document into a missing index
/// creates it with empty mappings, like a dynamic-mapping service would.
///
/// # Example
///
/// ```ignore
/// use hubdocs_index::{IndexClient, MemoryIndex};
/// use serde_json::json;
///
/// let index = MemoryIndex::new();
/// index.put_document("hubdocs-pages", "guide.html", &json!({"path": "guide.html"}))?;
/// assert_eq!(index.document_count("hubdocs-pages"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryIndex {
    indexes: RwLock<BTreeMap<String, MemIndex>>,
    calls: RwLock<HashMap<(&'static str, String), usize>>,
    failures: RwLock<usize>,
}

impl MemoryIndex {
    /// Create an empty index service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` calls fail with HTTP 503.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_next(&self, count: usize) {
        *self.failures.write().unwrap() = count;
    }

    /// Whether an index exists.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn has_index(&self, index: &str) -> bool {
        self.indexes.read().unwrap().contains_key(index)
    }

    /// Number of documents in an index (0 if missing).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn document_count(&self, index: &str) -> usize {
        self.indexes
            .read()
            .unwrap()
            .get(index)
            .map_or(0, |i| i.documents.len())
    }

    /// Ids of all documents in an index, sorted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn document_ids(&self, index: &str) -> Vec<String> {
        self.indexes
            .read()
            .unwrap()
            .get(index)
            .map(|i| i.documents.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// How many times `operation` was called against `index`.
    ///
    /// Operation names: `mapping`, `create_index`, `delete_index`,
    /// `put_document`, `get_document`, `delete_document`, `bulk_upsert`,
    /// `delete_by_query`, `search`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self, operation: &str, index: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|((op, name), _)| *op == operation && name == index)
            .map(|(_, count)| *count)
            .sum()
    }

    /// Forget all recorded call counts.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn reset_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    /// Record a call and consume an injected failure, if any.
    fn enter(&self, operation: &'static str, index: &str) -> Result<(), IndexError> {
        *self
            .calls
            .write()
            .unwrap()
            .entry((operation, index.to_owned()))
            .or_default() += 1;

        let mut failures = self.failures.write().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(IndexError::HttpResponse {
                method: "MOCK",
                url: format!("memory://{index}/{operation}"),
                status: 503,
                body: "injected failure".to_owned(),
            });
        }
        Ok(())
    }
}

impl IndexClient for MemoryIndex {
    fn mapping(&self, index: &str) -> Result<Option<Value>, IndexError> {
        self.enter("mapping", index)?;
        Ok(self
            .indexes
            .read()
            .unwrap()
            .get(index)
            .map(|i| i.mappings.clone()))
    }

    fn create_index(&self, index: &str, mappings: &Value) -> Result<(), IndexError> {
        self.enter("create_index", index)?;
        let mut indexes = self.indexes.write().unwrap();
        if indexes.contains_key(index) {
            return Err(IndexError::HttpResponse {
                method: "PUT",
                url: format!("memory://{index}"),
                status: 400,
                body: "resource_already_exists_exception".to_owned(),
            });
        }
        indexes.insert(
            index.to_owned(),
            MemIndex {
                mappings: mappings.clone(),
                documents: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn delete_index(&self, index: &str) -> Result<(), IndexError> {
        self.enter("delete_index", index)?;
        self.indexes.write().unwrap().remove(index);
        Ok(())
    }

    fn put_document(&self, index: &str, id: &str, body: &Value) -> Result<(), IndexError> {
        self.enter("put_document", index)?;
        self.indexes
            .write()
            .unwrap()
            .entry(index.to_owned())
            .or_default()
            .documents
            .insert(id.to_owned(), body.clone());
        Ok(())
    }

    fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, IndexError> {
        self.enter("get_document", index)?;
        Ok(self
            .indexes
            .read()
            .unwrap()
            .get(index)
            .and_then(|i| i.documents.get(id))
            .cloned())
    }

    fn delete_document(&self, index: &str, id: &str) -> Result<(), IndexError> {
        self.enter("delete_document", index)?;
        if let Some(i) = self.indexes.write().unwrap().get_mut(index) {
            i.documents.remove(id);
        }
        Ok(())
    }

    fn bulk_upsert(&self, index: &str, documents: &[IndexDocument]) -> Result<(), IndexError> {
        self.enter("bulk_upsert", index)?;
        let mut indexes = self.indexes.write().unwrap();
        let target = indexes.entry(index.to_owned()).or_default();
        for doc in documents {
            target.documents.insert(doc.id.clone(), doc.body.clone());
        }
        Ok(())
    }

    fn delete_by_query(&self, index: &str, field: &str, value: &str) -> Result<(), IndexError> {
        self.enter("delete_by_query", index)?;
        if let Some(i) = self.indexes.write().unwrap().get_mut(index) {
            let pointer = field_pointer(field);
            i.documents
                .retain(|_, doc| doc.pointer(&pointer).and_then(Value::as_str) != Some(value));
        }
        Ok(())
    }

    fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<SearchHit>, IndexError> {
        self.enter("search", index)?;
        let indexes = self.indexes.read().unwrap();
        let Some(target) = indexes.get(index) else {
            return Ok(Vec::new());
        };

        let needle = request.query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let hits = target
            .documents
            .iter()
            .filter_map(|(id, doc)| {
                let mut matched = false;
                let mut highlight = BTreeMap::new();
                for field in &request.fields {
                    let Some(text) = doc.pointer(&field_pointer(field)).and_then(Value::as_str)
                    else {
                        continue;
                    };
                    if let Some(fragment) = highlight_match(text, &needle) {
                        matched = true;
                        if request.highlight.contains(field) {
                            highlight.insert(field.clone(), vec![fragment]);
                        }
                    }
                }
                matched.then(|| SearchHit {
                    id: id.clone(),
                    source: doc.clone(),
                    highlight,
                })
            })
            .skip(request.from)
            .take(request.size)
            .collect();

        Ok(hits)
    }
}

/// Convert a dotted field name into a JSON pointer.
fn field_pointer(field: &str) -> String {
    format!("/{}", field.replace('.', "/"))
}

/// Wrap the first case-insensitive occurrence of `needle` in `<em>`.
///
/// `needle` must already be lowercase.
fn highlight_match(text: &str, needle: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let start = lowered.find(needle)?;
    let end = start + needle.len();
    // Lowercasing can change byte lengths for some scripts; fall back to
    // the unmarked text rather than slicing inside a character.
    if lowered.len() != text.len() || !text.is_char_boundary(start) || !text.is_char_boundary(end)
    {
        return Some(text.to_owned());
    }
    Some(format!(
        "{}<em>{}</em>{}",
        &text[..start],
        &text[start..end],
        &text[end..]
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn seeded() -> MemoryIndex {
        let index = MemoryIndex::new();
        index
            .bulk_upsert(
                "headings",
                &[
                    IndexDocument::new("a.html#install", json!({"path": "a.html", "title": "Install"})),
                    IndexDocument::new("b.html#usage", json!({"path": "b.html", "title": "Usage"})),
                    IndexDocument::new("c.html#reinstall", json!({"path": "c.html", "title": "Reinstall guide"})),
                ],
            )
            .unwrap();
        index.reset_calls();
        index
    }

    #[test]
    fn test_search_matches_case_insensitively_with_highlight() {
        let index = seeded();

        let hits = index
            .search("headings", &SearchRequest::new("INSTALL", &["title"], 0, 10))
            .unwrap();

        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a.html#install", "c.html#reinstall"]);
        assert_eq!(hits[0].highlight["title"], vec!["<em>Install</em>".to_owned()]);
        assert_eq!(hits[1].highlight["title"], vec!["Re<em>install</em> guide".to_owned()]);
    }

    #[test]
    fn test_search_paginates() {
        let index = seeded();
        let request = |from| SearchRequest::new("install", &["title"], from, 1);

        assert_eq!(index.search("headings", &request(0)).unwrap()[0].id, "a.html#install");
        assert_eq!(index.search("headings", &request(1)).unwrap()[0].id, "c.html#reinstall");
        assert!(index.search("headings", &request(2)).unwrap().is_empty());
        assert_eq!(index.calls("search", "headings"), 3);
    }

    #[test]
    fn test_search_missing_index_is_empty() {
        let index = MemoryIndex::new();
        let hits = index
            .search("nope", &SearchRequest::new("x", &["title"], 0, 10))
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_delete_by_query_nested_field() {
        let index = MemoryIndex::new();
        index
            .bulk_upsert(
                "sections",
                &[
                    IndexDocument::new("a.html#x", json!({"path": "a.html"})),
                    IndexDocument::new("a.html#y", json!({"path": "a.html"})),
                    IndexDocument::new("b.html#x", json!({"path": "b.html"})),
                ],
            )
            .unwrap();

        index.delete_by_query("sections", "path", "a.html").unwrap();

        assert_eq!(index.document_ids("sections"), vec!["b.html#x"]);
    }

    #[test]
    fn test_missing_resources_are_absent_not_errors() {
        let index = MemoryIndex::new();

        assert_eq!(index.mapping("pages").unwrap(), None);
        assert_eq!(index.get_document("pages", "a.html").unwrap(), None);
        index.delete_document("pages", "a.html").unwrap();
        index.delete_index("pages").unwrap();
        index.delete_by_query("pages", "path", "a.html").unwrap();
    }

    #[test]
    fn test_create_existing_index_fails() {
        let index = MemoryIndex::new();
        index.create_index("pages", &json!({})).unwrap();

        let err = index.create_index("pages", &json!({})).unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_fail_next_injects_errors() {
        let index = MemoryIndex::new();
        index.fail_next(2);

        assert!(index.put_document("pages", "a", &json!({})).is_err());
        assert!(index.put_document("pages", "a", &json!({})).is_err());
        assert!(index.put_document("pages", "a", &json!({})).is_ok());
        assert_eq!(index.calls("put_document", "pages"), 3);
        assert_eq!(index.document_count("pages"), 1);
    }
}
