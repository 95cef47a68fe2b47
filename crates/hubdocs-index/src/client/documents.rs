//! Document operations.

use serde_json::{Value, json};
use tracing::{debug, error};

use super::{Body, HttpIndexClient, Method, NOT_FOUND, segment};
use crate::error::IndexError;
use crate::index::IndexDocument;

impl HttpIndexClient {
    /// Create or replace a document.
    pub(crate) fn put_doc(&self, index: &str, id: &str, body: &Value) -> Result<(), IndexError> {
        let path = format!("{index}/_doc/{}?refresh=wait_for", segment(id));
        debug!(index, id, "Putting document");
        let payload = serde_json::to_vec(body)?;
        self.send(Method::Put, &path, Some(Body::Json(payload)), &[])?;
        Ok(())
    }

    /// Get a document's `_source`, `None` if the index or document is missing.
    pub(crate) fn get_doc(&self, index: &str, id: &str) -> Result<Option<Value>, IndexError> {
        let path = format!("{index}/_doc/{}", segment(id));
        let Some(mut response) = self.send(Method::Get, &path, None, NOT_FOUND)? else {
            return Ok(None);
        };

        if response.get("found").and_then(Value::as_bool) == Some(false) {
            return Ok(None);
        }

        Ok(response.get_mut("_source").map(Value::take))
    }

    /// Delete a document; a missing document is not an error.
    pub(crate) fn delete_doc(&self, index: &str, id: &str) -> Result<(), IndexError> {
        let path = format!("{index}/_doc/{}?refresh=wait_for", segment(id));
        debug!(index, id, "Deleting document");
        self.send(Method::Delete, &path, None, NOT_FOUND)?;
        Ok(())
    }

    /// Index many documents with one `_bulk` request.
    pub(crate) fn bulk(&self, index: &str, documents: &[IndexDocument]) -> Result<(), IndexError> {
        if documents.is_empty() {
            return Ok(());
        }

        debug!(index, count = documents.len(), "Bulk upserting documents");
        let response = self.send(
            Method::Post,
            "_bulk?refresh=wait_for",
            Some(Body::NdJson(bulk_payload(index, documents).into_bytes())),
            &[],
        )?;

        check_bulk_response(index, documents.len(), response.as_ref())
    }

    /// Delete every document whose keyword `field` equals `value`.
    pub(crate) fn delete_matching(
        &self,
        index: &str,
        field: &str,
        value: &str,
    ) -> Result<(), IndexError> {
        let path = format!("{index}/_delete_by_query?refresh=true&conflicts=proceed");
        let payload = serde_json::to_vec(&json!({ "query": { "term": { field: value } } }))?;
        debug!(index, field, value, "Deleting by query");
        self.send(Method::Post, &path, Some(Body::Json(payload)), NOT_FOUND)?;
        Ok(())
    }
}

/// Newline-delimited `_bulk` body: one action line and one source line per
/// document.
fn bulk_payload(index: &str, documents: &[IndexDocument]) -> String {
    let mut payload = String::new();
    for doc in documents {
        let action = json!({ "index": { "_index": index, "_id": doc.id } });
        payload.push_str(&action.to_string());
        payload.push('\n');
        payload.push_str(&doc.body.to_string());
        payload.push('\n');
    }
    payload
}

/// Turn a `_bulk` answer into an error when any item was rejected.
///
/// The service answers 200 even when items fail; only the top-level
/// `errors` flag and the per-item `error` objects tell.
fn check_bulk_response(index: &str, total: usize, response: Option<&Value>) -> Result<(), IndexError> {
    let Some(response) = response else {
        return Ok(());
    };
    if response.get("errors").and_then(Value::as_bool) != Some(true) {
        return Ok(());
    }

    let rejected = response
        .get("items")
        .and_then(Value::as_array)
        .map_or(0, |items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter(|item| item.values().any(|result| result.get("error").is_some()))
                .count()
        });
    // The flag alone does not say which items failed.
    let failed = if rejected == 0 { total } else { rejected };

    error!(index, failed, total, "bulk items rejected");
    Err(IndexError::BulkRejected {
        index: index.to_owned(),
        failed,
        total,
    })
}
