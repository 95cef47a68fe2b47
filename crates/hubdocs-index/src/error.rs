//! Error types for search index operations.

use crate::retry::RetryError;

/// Error from search index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// HTTP request failed (network error, timeout, etc).
    #[error("HTTP request failed")]
    HttpRequest(#[from] ureq::Error),

    /// Server answered with a status outside the ignore list.
    #[error("{method} {url} failed: HTTP {status} - {body}")]
    HttpResponse {
        /// HTTP method of the failed request.
        method: &'static str,
        /// Full request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// Bulk request was accepted but some items were rejected.
    #[error("bulk upsert into {index} rejected {failed} of {total} documents")]
    BulkRejected {
        /// Target index.
        index: String,
        /// Number of rejected items.
        failed: usize,
        /// Number of items sent.
        total: usize,
    },

    /// Response body did not have the expected shape.
    #[error("unexpected response from {url}: {message}")]
    UnexpectedResponse {
        /// Request URL.
        url: String,
        /// What was missing or malformed.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Bounded retry gave up.
    #[error("{operation} failed after {attempts} attempts")]
    RetriesExhausted {
        /// Operation label (e.g. `"bulk upsert hubdocs-sections"`).
        operation: String,
        /// Attempts made.
        attempts: u32,
        /// Error of the last attempt.
        #[source]
        source: Box<IndexError>,
    },
}

impl IndexError {
    /// HTTP status of a failed response, if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpResponse { status, .. } => Some(*status),
            Self::RetriesExhausted { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<RetryError<IndexError>> for IndexError {
    fn from(err: RetryError<IndexError>) -> Self {
        Self::RetriesExhausted {
            operation: err.operation,
            attempts: err.attempts,
            source: Box::new(err.source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error() -> IndexError {
        IndexError::HttpResponse {
            method: "PUT",
            url: "http://localhost:9200/hubdocs-pages/_doc/a.html".to_owned(),
            status: 503,
            body: "unavailable".to_owned(),
        }
    }

    #[test]
    fn test_http_response_display() {
        let msg = server_error().to_string();
        assert!(msg.contains("PUT"));
        assert!(msg.contains("hubdocs-pages"));
        assert!(msg.contains("503"));
    }

    #[test]
    fn test_retries_exhausted_from_retry_error() {
        let err: IndexError = RetryError {
            operation: "put hubdocs-pages/a.html".to_owned(),
            attempts: 3,
            source: server_error(),
        }
        .into();

        assert_eq!(err.to_string(), "put hubdocs-pages/a.html failed after 3 attempts");
        assert_eq!(err.status(), Some(503));
        assert!(std::error::Error::source(&err).is_some());
    }
}
