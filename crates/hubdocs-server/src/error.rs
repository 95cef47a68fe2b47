//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hubdocs_site::SiteError;
use serde_json::json;

use crate::auth::AuthError;

/// Generic message for faults whose details stay in the logs.
const INTERNAL_ERROR: &str = "Internal Error";

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Page missing or hidden from the caller.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// Caller lacks the role an operation requires.
    #[error("Forbidden")]
    Forbidden,

    /// Repository, sync or search failure.
    #[error(transparent)]
    Site(#[from] SiteError),

    /// Caller roles could not be resolved.
    #[error("role resolution failed: {0}")]
    Auth(#[from] AuthError),

    /// Blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::PageNotFound(path) => (
                StatusCode::NOT_FOUND,
                json!({"error": "Page not found", "path": path}),
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, json!({"error": "Forbidden"})),
            Self::Site(e) => match e.public_message() {
                Some(message) => {
                    tracing::warn!(error = %e, "Content not ready");
                    (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": message}))
                }
                None => {
                    tracing::error!(error = %e, "Request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({"error": INTERNAL_ERROR}),
                    )
                }
            },
            Self::Auth(_) | Self::Task(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": INTERNAL_ERROR}),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}
