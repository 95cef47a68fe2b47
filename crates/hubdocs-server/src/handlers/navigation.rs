//! Navigation API endpoint.
//!
//! Returns the main navigation tree trimmed for the caller.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use hubdocs_site::{AccessFilter, NAVIGATION_PAGE, TocEntry};
use serde::{Deserialize, Serialize};

use crate::auth::UserRoles;
use crate::error::ServerError;
use crate::handlers::blocking;
use crate::state::AppState;

/// Query parameters for GET /api/navigation.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct NavigationQuery {
    /// Page the links are resolved against.
    #[serde(default)]
    path: Option<String>,
}

/// Response for GET /api/navigation.
#[derive(Serialize)]
pub(crate) struct NavigationResponse {
    /// Visible navigation entries, in tree order.
    items: Vec<TocEntry>,
}

/// Handle GET /api/navigation.
pub(crate) async fn get_navigation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NavigationQuery>,
    UserRoles(roles): UserRoles,
) -> Result<Json<NavigationResponse>, ServerError> {
    let repository = Arc::clone(&state.repository);
    let current = query
        .path
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| NAVIGATION_PAGE.to_owned());

    let items = blocking(move || {
        let toc = repository.main_toc()?;
        let effective = repository.effective_roles()?;
        Ok(AccessFilter::new(&effective).filter_tree(&toc, &roles, &current))
    })
    .await?;

    Ok(Json(NavigationResponse { items }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_response_serialization() {
        let response = NavigationResponse {
            items: vec![TocEntry::new(1, "guide/index.html", "Guide")],
        };

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["items"][0]["title"], "Guide");
        assert_eq!(json["items"][0]["href"], "guide/index.html");
        assert_eq!(json["items"][0]["level"], 1);
    }
}
