//! HTTP server for hubdocs.
//!
//! This crate serves the search index kept by `hubdocs-site` over a JSON API:
//! - pages with their embedded navigation trimmed per caller
//! - the main navigation tree
//! - role-filtered search over headings and sections
//! - an admin-only sync trigger
//!
//! # Quick Start
//!
//! ```ignore
//! use hubdocs_config::Config;
//! use hubdocs_server::{run_server, server_config_from_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None, None).unwrap();
//!     run_server(server_config_from_config(&config)).await.unwrap();
//! }
//! ```
//!
//! # Startup
//!
//! Without live reload the initial sync runs in the foreground and the
//! listener is bound only once it succeeds. With live reload the server binds
//! immediately, syncs in the background and answers "Sync in progress" until
//! the first snapshot lands.

mod app;
mod auth;
mod error;
mod handlers;
mod live_reload;
mod middleware;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hubdocs_cache::MemoryCache;
use hubdocs_config::{AuthConfig, IndexConfig, LiveReloadConfig, SearchConfig, SyncConfig};
use hubdocs_index::{BasicAuth, HttpIndexClient, RetryError, RetryPolicy};
use hubdocs_site::{FsContentSource, IndexRepository, RepositoryConfig, SiteError, SyncReport};
use state::{AppState, SearchLimits};

pub use auth::{
    AuthError, DEFAULT_IDENTITY_CACHE_TTL, HeaderRoleResolver, IdentityRoleResolver, RoleResolver,
};
pub use error::ServerError;

/// Timeout of a single identity service request.
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Post-processor output directory.
    pub content_dir: PathBuf,
    /// Search index connection.
    pub index: IndexConfig,
    /// Search aggregation settings.
    pub search: SearchConfig,
    /// Outer retry policy for whole sync runs.
    pub sync: SyncConfig,
    /// Live reload settings.
    pub live_reload: LiveReloadConfig,
    /// Caller role resolution.
    pub auth: AuthConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7979,
            content_dir: PathBuf::from("build"),
            index: IndexConfig::default(),
            search: SearchConfig::default(),
            sync: SyncConfig::default(),
            live_reload: LiveReloadConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Create server configuration from hubdocs config.
#[must_use]
pub fn server_config_from_config(config: &hubdocs_config::Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        content_dir: config.content_resolved.dir.clone(),
        index: config.index.clone(),
        search: config.search.clone(),
        sync: config.sync.clone(),
        live_reload: config.live_reload.clone(),
        auth: config.auth.clone(),
    }
}

/// Build the index repository described by `config`.
///
/// Pages are read from the content directory, the index is reached over
/// HTTP and lookups are memoized in process memory.
#[must_use]
pub fn create_repository(config: &ServerConfig) -> IndexRepository {
    let auth = config.index.username.as_ref().map(|username| BasicAuth {
        username: username.clone(),
        password: config.index.password.clone().unwrap_or_default(),
    });
    let client = HttpIndexClient::new(&config.index.url, auth, config.index.timeout());

    IndexRepository::new(
        Arc::new(client),
        Arc::new(FsContentSource::new(config.content_dir.clone())),
        Arc::new(MemoryCache::new()),
        RepositoryConfig {
            prefix: config.index.prefix.clone(),
            search_page_size: config.search.page_size,
            bulk_chunk_size: config.index.bulk_chunk_size,
            write_retry: RetryPolicy::new(config.index.max_retries, config.index.retry_backoff()),
        },
    )
}

/// Build the role resolver described by `auth`.
///
/// An identity service, when configured, wins over the trusted header.
///
/// # Errors
///
/// Returns [`AuthError::InvalidHeader`] if the header name is invalid.
pub fn create_role_resolver(auth: &AuthConfig) -> Result<Arc<dyn RoleResolver>, AuthError> {
    if let Some(url) = &auth.identity_url {
        tracing::info!(url = %url, "Resolving roles through identity service");
        let retry = RetryPolicy::new(auth.identity_max_retries, auth.identity_retry_backoff());
        let resolver = IdentityRoleResolver::new(url, IDENTITY_TIMEOUT, retry)
            .with_cache_ttl(auth.identity_cache_ttl());
        return Ok(Arc::new(resolver));
    }

    tracing::info!(header = %auth.roles_header, "Resolving roles from request header");
    Ok(Arc::new(HeaderRoleResolver::new(&auth.roles_header)?))
}

/// Outer retry policy for whole sync runs.
#[must_use]
pub fn sync_retry_policy(sync: &SyncConfig) -> RetryPolicy {
    RetryPolicy::new(sync.max_attempts, sync.retry_backoff())
}

/// Run sync until it succeeds or `retry` gives up. Blocks.
///
/// # Errors
///
/// Returns the last sync error once every attempt has failed.
pub fn sync_with_retry(
    repository: &IndexRepository,
    retry: &RetryPolicy,
) -> Result<SyncReport, RetryError<SiteError>> {
    retry.run("sync", || repository.sync())
}

/// Run the server.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the foreground sync fails, the content watcher
/// cannot start or the listener cannot be bound.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let repository = Arc::new(create_repository(&config));
    let roles = create_role_resolver(&config.auth)?;
    let sync_retry = sync_retry_policy(&config.sync);

    // Held until shutdown; dropping it stops the watch.
    let _watcher = if config.live_reload.enabled {
        live_reload::spawn_sync(Arc::clone(&repository), sync_retry, "startup");
        if config.live_reload.watch {
            Some(live_reload::ContentWatcher::start(
                &config.content_dir,
                Arc::clone(&repository),
                sync_retry,
                live_reload::DEFAULT_DEBOUNCE,
            )?)
        } else {
            None
        }
    } else {
        let repo = Arc::clone(&repository);
        let report = tokio::task::spawn_blocking(move || sync_with_retry(&repo, &sync_retry)).await??;
        tracing::info!(
            added = report.added,
            updated = report.updated,
            deleted = report.deleted,
            "Initial sync finished"
        );
        None
    };

    let state = Arc::new(AppState {
        repository,
        roles,
        search: SearchLimits {
            default_limit: config.search.default_limit,
            max_limit: config.search.max_limit,
        },
    });
    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
