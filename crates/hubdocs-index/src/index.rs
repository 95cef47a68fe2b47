//! Index client trait and request/response types.
//!
//! Index names passed to [`IndexClient`] methods are full names, already
//! scoped by the configured prefix (e.g. `"hubdocs-pages"`). Document ids are
//! opaque strings and may contain `/` and `#`; implementations take care of
//! any escaping their transport needs.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::IndexError;

/// A document addressed by id, ready for a bulk write.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexDocument {
    /// Document id, unique within its index.
    pub id: String,
    /// Document body.
    pub body: Value,
}

impl IndexDocument {
    /// Create a document from an id and a JSON body.
    #[must_use]
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }
}

/// A single page of a full-text query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    /// Free-text query.
    pub query: String,
    /// Fields matched against the query, dotted for nested objects.
    pub fields: Vec<String>,
    /// Offset of the first hit.
    pub from: usize,
    /// Maximum hits in this page.
    pub size: usize,
    /// Fields for which highlight fragments are requested.
    pub highlight: Vec<String>,
}

impl SearchRequest {
    /// Create a request highlighting every matched field.
    #[must_use]
    pub fn new(query: &str, fields: &[&str], from: usize, size: usize) -> Self {
        let fields: Vec<String> = fields.iter().map(|f| (*f).to_owned()).collect();
        Self {
            query: query.to_owned(),
            highlight: fields.clone(),
            fields,
            from,
            size,
        }
    }
}

/// A search hit in relevance order.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    /// Document id.
    pub id: String,
    /// Stored document body.
    pub source: Value,
    /// Highlight fragments by field, matched terms wrapped in `<em>`.
    pub highlight: BTreeMap<String, Vec<String>>,
}

/// Abstraction over an external document search index.
///
/// Reads and deletes treat a missing index or document as absence, not as
/// an error. Every other failure surfaces as [`IndexError`] after being logged
/// once by the implementation. Implementations do not retry; callers wrap
/// calls in [`RetryPolicy`](crate::RetryPolicy) where a retry is wanted.
pub trait IndexClient: Send + Sync {
    /// Get the live mappings object of an index (`{"properties": {...}}`).
    ///
    /// Returns `None` if the index does not exist.
    fn mapping(&self, index: &str) -> Result<Option<Value>, IndexError>;

    /// Create an index with the given mappings object.
    fn create_index(&self, index: &str, mappings: &Value) -> Result<(), IndexError>;

    /// Delete an index. Deleting a missing index succeeds.
    fn delete_index(&self, index: &str) -> Result<(), IndexError>;

    /// Create or replace a document by id.
    fn put_document(&self, index: &str, id: &str, body: &Value) -> Result<(), IndexError>;

    /// Get a document body by id, `None` if the index or document is missing.
    fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, IndexError>;

    /// Delete a document by id. Deleting a missing document succeeds.
    fn delete_document(&self, index: &str, id: &str) -> Result<(), IndexError>;

    /// Create or replace many documents in one request.
    fn bulk_upsert(&self, index: &str, documents: &[IndexDocument]) -> Result<(), IndexError>;

    /// Delete every document whose keyword `field` equals `value`.
    fn delete_by_query(&self, index: &str, field: &str, value: &str) -> Result<(), IndexError>;

    /// Run one page of a full-text query. A missing index yields no hits.
    fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<SearchHit>, IndexError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_highlights_matched_fields() {
        let request = SearchRequest::new("install", &["title", "content"], 20, 10);

        assert_eq!(request.query, "install");
        assert_eq!(request.fields, vec!["title", "content"]);
        assert_eq!(request.highlight, request.fields);
        assert_eq!(request.from, 20);
        assert_eq!(request.size, 10);
    }
}
