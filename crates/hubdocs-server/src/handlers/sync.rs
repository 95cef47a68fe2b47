//! Sync trigger endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use hubdocs_site::{Role, SyncReport};

use crate::auth::UserRoles;
use crate::error::ServerError;
use crate::handlers::blocking;
use crate::state::AppState;

/// Handle POST /api/sync.
///
/// Runs one sync pass; admins only.
pub(crate) async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    UserRoles(roles): UserRoles,
) -> Result<Json<SyncReport>, ServerError> {
    if !roles.contains(&Role::Admin) {
        return Err(ServerError::Forbidden);
    }

    let repository = Arc::clone(&state.repository);
    let report = blocking(move || repository.sync().map_err(ServerError::from)).await?;
    tracing::info!(
        added = report.added,
        updated = report.updated,
        deleted = report.deleted,
        "Sync triggered over HTTP"
    );
    Ok(Json(report))
}
