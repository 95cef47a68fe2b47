//! Pages API endpoint.
//!
//! Returns a page document with its embedded navigation trimmed to what the
//! caller may see, plus its neighbours in the caller's main navigation.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use hubdocs_site::{
    AccessFilter, HeadingEntry, IndexRepository, NAVIGATION_PAGE, Page, PageLinks, PageMeta, Role,
    RoleSet, RolesByPath, Section, Toc,
};
use serde::Serialize;

use crate::auth::UserRoles;
use crate::error::ServerError;
use crate::handlers::blocking;
use crate::state::AppState;

/// Page flags exposed to clients. Declared roles stay server-side.
#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageMetaResponse {
    show_footer_navigation: bool,
    full_width: bool,
}

impl From<PageMeta> for PageMetaResponse {
    fn from(meta: PageMeta) -> Self {
        Self {
            show_footer_navigation: meta.show_footer_navigation,
            full_width: meta.full_width,
        }
    }
}

/// Response for GET /api/pages/{path}.
#[derive(Serialize)]
struct PageResponse {
    /// Site-relative page path.
    path: String,
    /// Front matter flags.
    meta: PageMetaResponse,
    /// Rendered HTML body.
    html: String,
    /// Sections in document order.
    sections: Vec<Section>,
    /// Headings in document order.
    headings: Vec<HeadingEntry>,
    /// Embedded navigation trees, filtered for the caller.
    tocs: Vec<Toc>,
    /// `level`, `previous` and `next` along the filtered main navigation.
    #[serde(flatten)]
    links: PageLinks,
}

/// Everything a page response is built from.
struct PageLookup {
    page: Page,
    effective: RolesByPath,
    navigation: Option<Page>,
}

/// Handle GET /api/pages/{path}.
///
/// Paths without `.html` fall back to `{path}.html`, then the directory
/// index. Hidden pages answer 404 like missing ones.
pub(crate) async fn get_page(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
    UserRoles(roles): UserRoles,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    let repository = Arc::clone(&state.repository);
    let requested = path.clone();
    let lookup = blocking(move || lookup_page(&repository, &requested)).await?;

    let Some(PageLookup {
        page,
        effective,
        navigation,
    }) = lookup
    else {
        return Err(ServerError::PageNotFound(path));
    };

    let filter = AccessFilter::new(&effective);
    if !filter.can_see(&page.path, &roles) {
        tracing::debug!(path = %page.path, "Page hidden from caller");
        return Err(ServerError::PageNotFound(path));
    }

    let navigation_hash = navigation.as_ref().map_or("", |nav| nav.hash.as_str());
    let etag = compute_etag(&page.hash, navigation_hash, &roles);
    if is_not_modified(&headers, &etag) {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let main_toc = navigation
        .and_then(|nav| nav.tocs.into_iter().next())
        .unwrap_or_default();
    let links = PageLinks::find(
        &filter.filter_tree(&main_toc, &roles, NAVIGATION_PAGE),
        &page.path,
        NAVIGATION_PAGE,
    );

    let response = PageResponse::filtered(page, &filter, &roles, links);
    Ok((
        [
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "private, max-age=60".to_owned()),
        ],
        Json(response),
    )
        .into_response())
}

/// Find the first existing candidate for `path` with the data to filter it.
fn lookup_page(repository: &IndexRepository, path: &str) -> Result<Option<PageLookup>, ServerError> {
    let mut found = None;
    for candidate in lookup_candidates(path) {
        found = repository.find_page_by_path(&candidate)?;
        if found.is_some() {
            break;
        }
    }
    let Some(page) = found else {
        return Ok(None);
    };

    let effective = repository.effective_roles()?;
    let navigation = repository.find_page_by_path(NAVIGATION_PAGE)?;
    Ok(Some(PageLookup {
        page,
        effective,
        navigation,
    }))
}

/// Index paths tried, in order, for a requested path.
fn lookup_candidates(path: &str) -> Vec<String> {
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.ends_with(".html") {
        vec![path.to_owned()]
    } else if path.is_empty() || path.ends_with('/') {
        vec![format!("{path}index.html")]
    } else {
        vec![format!("{path}.html"), format!("{path}/index.html")]
    }
}

impl PageResponse {
    fn filtered(page: Page, filter: &AccessFilter<'_>, roles: &RoleSet, links: PageLinks) -> Self {
        let tocs = page
            .tocs
            .iter()
            .map(|toc| filter.filter_tree(toc, roles, &page.path))
            .collect();

        Self {
            path: page.path,
            meta: page.meta.into(),
            html: page.html,
            sections: page.sections,
            headings: page.headings,
            tocs,
            links,
        }
    }
}

/// Compute `ETag` from the page hash, the navigation hash and the caller's
/// roles.
///
/// Links come from the navigation page and both filter per role set, so all
/// three go into the tag.
fn compute_etag(hash: &str, navigation_hash: &str, roles: &RoleSet) -> String {
    let clean =
        |value: &str| -> String { value.chars().filter(char::is_ascii_alphanumeric).collect() };
    let roles: Vec<&str> = roles.iter().copied().map(Role::as_str).collect();
    format!("\"{}.{}-{}\"", clean(hash), clean(navigation_hash), roles.join("+"))
}

/// Whether any `If-None-Match` header matches `etag`.
///
/// Each header is a comma-separated list; `*` matches anything and weak
/// tags (`W/"..."`) compare by their opaque part.
fn is_not_modified(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
}
