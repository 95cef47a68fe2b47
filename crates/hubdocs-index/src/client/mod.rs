//! Search service REST client.
//!
//! Provides a sync HTTP client for Elasticsearch/`OpenSearch` compatible
//! services with optional basic authentication.

mod documents;
mod indices;
mod search;
#[cfg(test)]
mod stub;

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use tracing::{debug, error};
use ureq::Agent;

use crate::error::IndexError;
use crate::index::{IndexClient, IndexDocument, SearchHit, SearchRequest};

/// Statuses that mean "absent" on reads and deletes.
const NOT_FOUND: &[u16] = &[404];

/// Basic auth credentials.
#[derive(Clone, Debug)]
pub struct BasicAuth {
    /// User name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl BasicAuth {
    fn header_value(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

/// HTTP method used by the internal request helper.
#[derive(Clone, Copy, Debug)]
enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// Request body with its content type.
enum Body {
    Json(Vec<u8>),
    NdJson(Vec<u8>),
}

/// Search service REST client.
pub struct HttpIndexClient {
    agent: Agent,
    base_url: String,
    auth_header: Option<String>,
}

impl HttpIndexClient {
    /// Create a client.
    ///
    /// # Arguments
    /// * `base_url` - Service base URL (e.g. `http://localhost:9200`)
    /// * `auth` - Optional basic auth credentials
    /// * `timeout` - Global per-request timeout
    #[must_use]
    pub fn new(base_url: &str, auth: Option<BasicAuth>, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            auth_header: auth.as_ref().map(BasicAuth::header_value),
        }
    }

    /// Build a URL from already-escaped path segments.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request and decode the JSON answer.
    ///
    /// Statuses listed in `ignore` yield `Ok(None)`. Any other status >= 400
    /// is logged with its request context and returned as
    /// [`IndexError::HttpResponse`].
    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Body>,
        ignore: &[u16],
    ) -> Result<Option<Value>, IndexError> {
        let url = self.url(path);

        let result = match (method, body) {
            (Method::Get, _) => self.authorize(self.agent.get(&url)).call(),
            (Method::Delete, _) => self.authorize(self.agent.delete(&url)).call(),
            (Method::Put, body) => {
                let (content_type, bytes) = body_parts(body);
                self.authorize(self.agent.put(&url))
                    .header("Content-Type", content_type)
                    .send(&bytes[..])
            }
            (Method::Post, body) => {
                let (content_type, bytes) = body_parts(body);
                self.authorize(self.agent.post(&url))
                    .header("Content-Type", content_type)
                    .send(&bytes[..])
            }
        };

        let response = result.map_err(|e| {
            error!(method = method.as_str(), url = %url, error = %e, "index request failed");
            IndexError::HttpRequest(e)
        })?;

        let status = response.status().as_u16();
        let mut body_reader = response.into_body();

        if ignore.contains(&status) {
            debug!(method = method.as_str(), url = %url, status, "ignored status");
            return Ok(None);
        }

        if status >= 400 {
            let error_body = body_reader
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_owned());
            error!(
                method = method.as_str(),
                url = %url,
                status,
                body = %error_body,
                "index request rejected"
            );
            return Err(IndexError::HttpResponse {
                method: method.as_str(),
                url,
                status,
                body: error_body,
            });
        }

        Ok(Some(body_reader.read_json()?))
    }

    /// Attach the authorization and accept headers.
    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request.header("Accept", "application/json");
        match &self.auth_header {
            Some(value) => request.header("Authorization", value),
            None => request,
        }
    }
}

fn body_parts(body: Option<Body>) -> (&'static str, Vec<u8>) {
    match body {
        Some(Body::Json(bytes)) => ("application/json", bytes),
        Some(Body::NdJson(bytes)) => ("application/x-ndjson", bytes),
        None => ("application/json", Vec::new()),
    }
}

/// Escape a document id or index name for use as one URL path segment.
fn segment(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

impl IndexClient for HttpIndexClient {
    fn mapping(&self, index: &str) -> Result<Option<Value>, IndexError> {
        self.get_mapping(index)
    }

    fn create_index(&self, index: &str, mappings: &Value) -> Result<(), IndexError> {
        self.create(index, mappings)
    }

    fn delete_index(&self, index: &str) -> Result<(), IndexError> {
        self.delete(index)
    }

    fn put_document(&self, index: &str, id: &str, body: &Value) -> Result<(), IndexError> {
        self.put_doc(index, id, body)
    }

    fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, IndexError> {
        self.get_doc(index, id)
    }

    fn delete_document(&self, index: &str, id: &str) -> Result<(), IndexError> {
        self.delete_doc(index, id)
    }

    fn bulk_upsert(&self, index: &str, documents: &[IndexDocument]) -> Result<(), IndexError> {
        self.bulk(index, documents)
    }

    fn delete_by_query(&self, index: &str, field: &str, value: &str) -> Result<(), IndexError> {
        self.delete_matching(index, field, value)
    }

    fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<SearchHit>, IndexError> {
        self.query(index, request)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::stub::{Reply, StubServer};
    use super::*;

    #[test]
    fn test_segment_escapes_path_and_anchor() {
        assert_eq!(segment("guide/intro.html#setup"), "guide%2Fintro%2Ehtml%23setup");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = HttpIndexClient::new("http://localhost:9200/", None, Duration::from_secs(1));
        assert_eq!(client.url("hubdocs-pages"), "http://localhost:9200/hubdocs-pages");
    }

    #[test]
    fn test_basic_auth_header() {
        let auth = BasicAuth {
            username: "elastic".to_owned(),
            password: "changeme".to_owned(),
        };
        assert_eq!(auth.header_value(), "Basic ZWxhc3RpYzpjaGFuZ2VtZQ==");
    }

    #[test]
    fn test_ignored_status_is_none() {
        let server = StubServer::start(vec![Reply::json(404, r#"{"error":"index_not_found"}"#)]);
        let client = HttpIndexClient::new(&server.url(), None, Duration::from_secs(5));

        let response = client.send(Method::Get, "docs-pages/_mapping", None, NOT_FOUND).unwrap();

        assert_eq!(response, None);
    }

    #[test]
    fn test_rejected_status_carries_request_context() {
        let server = StubServer::start(vec![Reply::json(500, r#"{"error":"boom"}"#)]);
        let client = HttpIndexClient::new(&server.url(), None, Duration::from_secs(5));

        let err = client.send(Method::Get, "docs-pages/_doc/a", None, NOT_FOUND).unwrap_err();

        match err {
            IndexError::HttpResponse {
                method,
                url,
                status,
                body,
            } => {
                assert_eq!(method, "GET");
                assert_eq!(url, format!("{}/docs-pages/_doc/a", server.url()));
                assert_eq!(status, 500);
                assert_eq!(body, r#"{"error":"boom"}"#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_found_is_an_error_when_not_ignored() {
        let server = StubServer::start(vec![Reply::json(404, "{}")]);
        let client = HttpIndexClient::new(&server.url(), None, Duration::from_secs(5));

        let err = client.send(Method::Put, "docs-pages", None, &[]).unwrap_err();

        assert!(matches!(err, IndexError::HttpResponse { status: 404, .. }));
    }

    #[test]
    fn test_index_lifecycle_tolerates_missing_index() {
        let server = StubServer::start(vec![
            Reply::json(404, "{}"),
            Reply::json(404, "{}"),
        ]);
        let client = HttpIndexClient::new(&server.url(), None, Duration::from_secs(5));

        assert_eq!(client.mapping("docs-pages").unwrap(), None);
        client.delete_index("docs-pages").unwrap();
        assert_eq!(
            server.requests(),
            vec!["GET /docs-pages/_mapping", "DELETE /docs-pages"]
        );
    }
}
