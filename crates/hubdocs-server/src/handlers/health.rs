//! Liveness endpoint.

use axum::Json;
use serde_json::{Value, json};

/// Handle GET /api/health.
pub(crate) async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
