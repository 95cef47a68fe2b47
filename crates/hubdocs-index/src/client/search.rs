//! Full-text search.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use super::{Body, HttpIndexClient, Method, NOT_FOUND};
use crate::error::IndexError;
use crate::index::{SearchHit, SearchRequest};

impl HttpIndexClient {
    /// Run one page of a `multi_match` query with highlighting.
    pub(crate) fn query(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<Vec<SearchHit>, IndexError> {
        let path = format!("{index}/_search");
        let payload = serde_json::to_vec(&search_body(request))?;

        let Some(response) = self.send(Method::Post, &path, Some(Body::Json(payload)), NOT_FOUND)?
        else {
            return Ok(Vec::new());
        };

        let hits = response
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .ok_or_else(|| IndexError::UnexpectedResponse {
                url: self.url(&path),
                message: "missing hits.hits array".to_owned(),
            })?;

        Ok(hits.iter().map(parse_hit).collect())
    }
}

/// Build the `_search` request body.
fn search_body(request: &SearchRequest) -> Value {
    let highlight_fields: Map<String, Value> = request
        .highlight
        .iter()
        .map(|field| (field.clone(), json!({ "number_of_fragments": 1, "fragment_size": 150 })))
        .collect();

    json!({
        "from": request.from,
        "size": request.size,
        "query": {
            "multi_match": {
                "query": request.query,
                "fields": request.fields,
            }
        },
        "highlight": {
            "pre_tags": ["<em>"],
            "post_tags": ["</em>"],
            "fields": highlight_fields,
        }
    })
}

fn parse_hit(hit: &Value) -> SearchHit {
    let highlight = hit
        .get("highlight")
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .map(|(field, fragments)| {
                    let fragments = fragments
                        .as_array()
                        .map(|list| {
                            list.iter()
                                .filter_map(Value::as_str)
                                .map(str::to_owned)
                                .collect()
                        })
                        .unwrap_or_default();
                    (field.clone(), fragments)
                })
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    SearchHit {
        id: hit
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned(),
        source: hit.get("_source").cloned().unwrap_or(Value::Null),
        highlight,
    }
}
