//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use hubdocs_site::IndexRepository;

use crate::auth::RoleResolver;

/// Result limits for the search endpoint.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SearchLimits {
    /// Limit when the request names none.
    pub(crate) default_limit: usize,
    /// Upper bound on any requested limit.
    pub(crate) max_limit: usize,
}

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Index-backed pages, navigation and search.
    pub(crate) repository: Arc<IndexRepository>,
    /// Caller role resolution.
    pub(crate) roles: Arc<dyn RoleResolver>,
    /// Search result limits.
    pub(crate) search: SearchLimits,
}
