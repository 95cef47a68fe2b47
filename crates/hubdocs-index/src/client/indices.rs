//! Index lifecycle operations.

use serde_json::{Value, json};
use tracing::info;

use super::{Body, HttpIndexClient, Method, NOT_FOUND};
use crate::error::IndexError;

impl HttpIndexClient {
    /// Get the mappings object of an index, `None` if it does not exist.
    pub(crate) fn get_mapping(&self, index: &str) -> Result<Option<Value>, IndexError> {
        let path = format!("{index}/_mapping");
        let Some(response) = self.send(Method::Get, &path, None, NOT_FOUND)? else {
            return Ok(None);
        };

        // Response is keyed by the concrete index name
        // (which differs from `index` when it is an alias).
        let mappings = response
            .as_object()
            .and_then(|indices| indices.values().next())
            .and_then(|entry| entry.get("mappings"))
            .cloned()
            .ok_or_else(|| IndexError::UnexpectedResponse {
                url: self.url(&path),
                message: "missing mappings object".to_owned(),
            })?;

        Ok(Some(mappings))
    }

    /// Create an index with the given mappings.
    pub(crate) fn create(&self, index: &str, mappings: &Value) -> Result<(), IndexError> {
        info!(index, "Creating index");
        let payload = serde_json::to_vec(&json!({ "mappings": mappings }))?;
        self.send(Method::Put, index, Some(Body::Json(payload)), &[])?;
        Ok(())
    }

    /// Delete an index; a missing index is not an error.
    pub(crate) fn delete(&self, index: &str) -> Result<(), IndexError> {
        info!(index, "Deleting index");
        self.send(Method::Delete, index, None, NOT_FOUND)?;
        Ok(())
    }
}
