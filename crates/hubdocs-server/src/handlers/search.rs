//! Search API endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use hubdocs_site::{SearchAggregator, SearchResult};
use serde::{Deserialize, Serialize};

use crate::auth::UserRoles;
use crate::error::ServerError;
use crate::handlers::blocking;
use crate::state::{AppState, SearchLimits};

/// Query parameters for GET /api/search.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    /// Search text.
    #[serde(default)]
    q: String,
    /// Requested result count.
    #[serde(default)]
    limit: Option<usize>,
}

/// Response for GET /api/search.
#[derive(Serialize)]
pub(crate) struct SearchResponse {
    /// Query as received.
    query: String,
    /// Visible results, headings first.
    results: Vec<SearchResult>,
}

/// Handle GET /api/search.
pub(crate) async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
    UserRoles(roles): UserRoles,
) -> Result<Json<SearchResponse>, ServerError> {
    let repository = Arc::clone(&state.repository);
    let limit = effective_limit(query.limit, state.search);
    let text = query.q.clone();

    let results = blocking(move || {
        SearchAggregator::new(&repository)
            .search(&text, limit, &roles)
            .map_err(ServerError::from)
    })
    .await?;

    Ok(Json(SearchResponse {
        query: query.q,
        results,
    }))
}

fn effective_limit(requested: Option<usize>, limits: SearchLimits) -> usize {
    requested
        .unwrap_or(limits.default_limit)
        .min(limits.max_limit)
}
