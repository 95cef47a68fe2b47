//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::sync::Arc;

use axum::Router;
use axum::middleware::map_response;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::security;
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route("/api/navigation", get(handlers::navigation::get_navigation))
        .route("/api/pages/{*path}", get(handlers::pages::get_page))
        .route("/api/search", get(handlers::search::search))
        .route("/api/sync", post(handlers::sync::trigger_sync))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(map_response(security::security_headers)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use hubdocs_site::{MemorySource, Role, RoleSet};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::testing::{ROLES_HEADER, navigation, page, page_with_heading, repository, state};

    /// Site with a public guide, an admin-only area and a user-only page
    /// outside the navigation.
    fn site() -> MemorySource {
        MemorySource::new()
            .with_page(navigation(&[
                (1, "guide/index.html", "Guide"),
                (1, "admin/index.html", "Admin"),
                (2, "admin/keys.html", "Keys"),
                (1, "https://status.example.com", "Status"),
            ]))
            .with_page(page_with_heading("guide/index.html", "g1", "install"))
            .with_page(page_with_heading("admin/index.html", "a1", "install-secrets"))
            .with_page(page("admin/keys.html", "k1"))
            .with_page(page("members.html", "m1"))
            .with_roles("guide/index.html", RoleSet::new())
            .with_roles("admin/index.html", RoleSet::from([Role::Admin]))
            .with_roles("admin/keys.html", RoleSet::new())
            .with_roles("members.html", RoleSet::from([Role::User]))
    }

    fn synced_router() -> Router {
        let (_index, repo) = repository(site());
        repo.sync().unwrap();
        create_router(state(repo))
    }

    async fn send(router: Router, method: Method, uri: &str, roles: Option<&str>) -> Response {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(roles) = roles {
            request = request.header(ROLES_HEADER, roles);
        }
        router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(synced_router(), Method::GET, "/api/health", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_security_headers_on_every_route() {
        let response = send(synced_router(), Method::GET, "/api/health", None).await;

        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert!(headers.contains_key("content-security-policy"));
    }

    #[tokio::test]
    async fn test_public_page() {
        let response = send(synced_router(), Method::GET, "/api/pages/guide/index.html", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "private, max-age=60");
        let body = body_json(response).await;
        assert_eq!(body["path"], "guide/index.html");
        assert_eq!(body["headings"][0]["slug"], "install");
    }

    #[tokio::test]
    async fn test_page_meta_hides_declared_roles() {
        let response = send(synced_router(), Method::GET, "/api/pages/members.html", Some("user")).await;

        let body = body_json(response).await;
        assert_eq!(body["meta"], json!({"showFooterNavigation": false, "fullWidth": false}));
        assert!(body["meta"].get("roles").is_none());
    }

    #[tokio::test]
    async fn test_page_links_follow_filtered_navigation() {
        let router = synced_router();

        let anonymous =
            body_json(send(router.clone(), Method::GET, "/api/pages/guide/index.html", None).await).await;
        let admin = body_json(
            send(router.clone(), Method::GET, "/api/pages/guide/index.html", Some("admin")).await,
        )
        .await;
        let child =
            body_json(send(router, Method::GET, "/api/pages/admin/keys.html", Some("admin")).await).await;

        assert_eq!(anonymous["level"], 1);
        assert_eq!(anonymous["previous"], Value::Null);
        assert_eq!(anonymous["next"]["title"], "Status");
        assert_eq!(admin["next"]["title"], "Admin");
        assert_eq!(child["level"], 2);
        assert_eq!(child["previous"]["href"], "admin/index.html");
        assert_eq!(child["next"]["href"], "https://status.example.com");
    }

    #[tokio::test]
    async fn test_page_outside_navigation_has_no_links() {
        let response = send(synced_router(), Method::GET, "/api/pages/members.html", Some("user")).await;

        let body = body_json(response).await;
        assert_eq!(body["level"], Value::Null);
        assert_eq!(body["next"], Value::Null);
    }

    #[tokio::test]
    async fn test_extensionless_paths_fall_back() {
        let router = synced_router();

        for uri in ["/api/pages/guide", "/api/pages/guide/"] {
            let response = send(router.clone(), Method::GET, uri, None).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert_eq!(body_json(response).await["path"], "guide/index.html", "{uri}");
        }

        let response = send(router, Method::GET, "/api/pages/members", Some("user")).await;
        assert_eq!(body_json(response).await["path"], "members.html");
    }

    #[tokio::test]
    async fn test_missing_page_is_404() {
        let response = send(synced_router(), Method::GET, "/api/pages/nope.html", None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["path"], "nope.html");
    }

    #[tokio::test]
    async fn test_hidden_page_is_404_for_anonymous() {
        let response = send(synced_router(), Method::GET, "/api/pages/admin/index.html", None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inherited_restriction_applies_to_child_page() {
        let router = synced_router();

        let anonymous = send(router.clone(), Method::GET, "/api/pages/admin/keys.html", None).await;
        let admin = send(router, Method::GET, "/api/pages/admin/keys.html", Some("admin")).await;

        assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);
        assert_eq!(admin.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_raw_roles_apply_outside_navigation() {
        let router = synced_router();

        let anonymous = send(router.clone(), Method::GET, "/api/pages/members.html", None).await;
        let user = send(router, Method::GET, "/api/pages/members.html", Some("user")).await;

        assert_eq!(anonymous.status(), StatusCode::NOT_FOUND);
        assert_eq!(user.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_matching_etag_is_not_modified() {
        let router = synced_router();
        let first = send(router.clone(), Method::GET, "/api/pages/guide/index.html", None).await;
        let etag = first.headers()[header::ETAG].clone();

        let request = Request::builder()
            .uri("/api/pages/guide/index.html")
            .header(header::IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        let second = router.oneshot(request).await.unwrap();

        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_weak_etag_in_list_is_not_modified() {
        let router = synced_router();
        let first = send(router.clone(), Method::GET, "/api/pages/guide/index.html", None).await;
        let etag = first.headers()[header::ETAG].to_str().unwrap().to_owned();

        let request = Request::builder()
            .uri("/api/pages/guide/index.html")
            .header(header::IF_NONE_MATCH, format!("\"stale\", W/{etag}"))
            .body(Body::empty())
            .unwrap();
        let second = router.oneshot(request).await.unwrap();

        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    async fn test_etag_differs_per_role_set() {
        let router = synced_router();

        let anonymous = send(router.clone(), Method::GET, "/api/pages/guide/index.html", None).await;
        let admin = send(router, Method::GET, "/api/pages/guide/index.html", Some("admin")).await;

        assert_ne!(anonymous.headers()[header::ETAG], admin.headers()[header::ETAG]);
    }

    #[tokio::test]
    async fn test_navigation_is_filtered_per_caller() {
        let router = synced_router();

        let anonymous = body_json(send(router.clone(), Method::GET, "/api/navigation", None).await).await;
        let admin =
            body_json(send(router, Method::GET, "/api/navigation", Some("admin")).await).await;

        let titles = |body: &Value| -> Vec<String> {
            body["items"]
                .as_array()
                .unwrap()
                .iter()
                .map(|item| item["title"].as_str().unwrap().to_owned())
                .collect()
        };
        assert_eq!(titles(&anonymous), vec!["Guide", "Status"]);
        assert_eq!(titles(&admin), vec!["Guide", "Admin", "Keys", "Status"]);
    }

    #[tokio::test]
    async fn test_navigation_before_sync_is_sync_in_progress() {
        let (_index, repo) = repository(site());
        let router = create_router(state(repo));

        let response = send(router, Method::GET, "/api/navigation", None).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "Sync in progress");
    }

    #[tokio::test]
    async fn test_search_filters_hidden_pages() {
        let router = synced_router();

        let anonymous =
            body_json(send(router.clone(), Method::GET, "/api/search?q=install", None).await).await;
        let admin =
            body_json(send(router, Method::GET, "/api/search?q=install", Some("admin")).await).await;

        let paths = |body: &Value| -> Vec<String> {
            body["results"]
                .as_array()
                .unwrap()
                .iter()
                .map(|r| r["path"].as_str().unwrap().to_owned())
                .collect()
        };
        assert_eq!(anonymous["query"], "install");
        assert!(paths(&anonymous).iter().all(|p| p == "guide/index.html"));
        assert!(paths(&admin).iter().any(|p| p == "admin/index.html"));
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let response = send(synced_router(), Method::GET, "/api/search?q=install&limit=1", None).await;

        let body = body_json(response).await;
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["results"][0]["kind"], "heading");
    }

    #[tokio::test]
    async fn test_blank_search_is_empty() {
        let response = send(synced_router(), Method::GET, "/api/search?q=", None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["results"], json!([]));
    }

    #[tokio::test]
    async fn test_sync_requires_admin() {
        let response = send(synced_router(), Method::POST, "/api/sync", Some("user")).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_sync_by_admin_returns_report() {
        let (_index, repo) = repository(site());
        let router = create_router(state(repo));

        let first = body_json(send(router.clone(), Method::POST, "/api/sync", Some("admin")).await).await;
        let second = body_json(send(router, Method::POST, "/api/sync", Some("admin")).await).await;

        assert_eq!(first["added"], 5);
        assert_eq!(second["added"], 0);
        assert_eq!(second["updated"], 0);
    }
}
