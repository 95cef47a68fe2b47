//! Caller role resolution.
//!
//! Every request carries a role set resolved by a [`RoleResolver`]:
//!
//! - [`HeaderRoleResolver`] trusts a header set by an authenticating proxy
//! - [`IdentityRoleResolver`] asks an identity service, forwarding the
//!   caller's `Authorization` header, and reuses the answer per credential
//!   for a while
//!
//! Anonymous callers resolve to the empty set and only see public content.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use hubdocs_index::{RetryError, RetryPolicy};
use hubdocs_site::{RoleSet, parse_role_list};
use serde::Deserialize;
use ureq::Agent;

use crate::error::ServerError;
use crate::state::AppState;

/// Role resolution error.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Configured header name is not a valid HTTP header name.
    #[error("invalid roles header name: {0}")]
    InvalidHeader(String),

    /// Identity service could not be reached.
    #[error("identity request failed: {0}")]
    Request(#[from] ureq::Error),

    /// Identity service answered with an unexpected status.
    #[error("identity service returned HTTP {status}")]
    Status {
        /// Response status.
        status: u16,
    },

    /// Identity service kept failing.
    #[error("{operation} failed after {attempts} attempts")]
    RetriesExhausted {
        /// Operation label.
        operation: String,
        /// Attempts made.
        attempts: u32,
        /// Error of the last attempt.
        #[source]
        source: Box<AuthError>,
    },
}

impl From<RetryError<AuthError>> for AuthError {
    fn from(err: RetryError<AuthError>) -> Self {
        Self::RetriesExhausted {
            operation: err.operation,
            attempts: err.attempts,
            source: Box::new(err.source),
        }
    }
}

/// Resolves the roles of the caller from request headers.
///
/// Implementations may block; the extractor runs them off the async runtime.
pub trait RoleResolver: Send + Sync {
    /// Roles held by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the roles cannot be determined. "No credentials"
    /// is not an error: it resolves to the empty set.
    fn resolve(&self, headers: &HeaderMap) -> Result<RoleSet, AuthError>;
}

/// Reads a comma-separated role list from a trusted header.
#[derive(Clone, Debug)]
pub struct HeaderRoleResolver {
    header: HeaderName,
}

impl HeaderRoleResolver {
    /// Create a resolver reading `header`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidHeader`] if `header` is not a valid name.
    pub fn new(header: &str) -> Result<Self, AuthError> {
        let header = HeaderName::try_from(header.to_ascii_lowercase())
            .map_err(|_| AuthError::InvalidHeader(header.to_owned()))?;
        Ok(Self { header })
    }
}

impl RoleResolver for HeaderRoleResolver {
    fn resolve(&self, headers: &HeaderMap) -> Result<RoleSet, AuthError> {
        Ok(headers
            .get_all(&self.header)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(parse_role_list)
            .collect())
    }
}

/// Response body of the identity service.
#[derive(Deserialize)]
struct IdentityResponse {
    #[serde(default)]
    roles: Vec<String>,
}

/// How long an identity answer is reused unless configured otherwise.
pub const DEFAULT_IDENTITY_CACHE_TTL: Duration = Duration::from_secs(600);

/// Asks an identity service for the caller's roles.
///
/// Answers are memoized per `Authorization` value for the cache TTL.
/// Failed lookups are not memoized.
pub struct IdentityRoleResolver {
    agent: Agent,
    url: String,
    retry: RetryPolicy,
    cache_ttl: Duration,
    resolved: Mutex<HashMap<String, (Instant, RoleSet)>>,
}

impl IdentityRoleResolver {
    /// Create a resolver calling `url`.
    ///
    /// # Arguments
    ///
    /// * `url` - Identity endpoint answering `{"roles": [...]}`
    /// * `timeout` - Per-request timeout
    /// * `retry` - Retry applied to transport failures and 5xx answers
    #[must_use]
    pub fn new(url: &str, timeout: Duration, retry: RetryPolicy) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            url: url.to_owned(),
            retry,
            cache_ttl: DEFAULT_IDENTITY_CACHE_TTL,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Reuse answers for `ttl`; zero asks the service on every request.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn cached(&self, authorization: &str) -> Option<RoleSet> {
        let resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        let (resolved_at, roles) = resolved.get(authorization)?;
        (resolved_at.elapsed() < self.cache_ttl).then(|| roles.clone())
    }

    fn remember(&self, authorization: &str, roles: &RoleSet) {
        if self.cache_ttl.is_zero() {
            return;
        }
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        resolved.retain(|_, (resolved_at, _)| resolved_at.elapsed() < self.cache_ttl);
        resolved.insert(authorization.to_owned(), (Instant::now(), roles.clone()));
    }

    fn fetch(&self, authorization: &str) -> Result<Option<RoleSet>, AuthError> {
        let response = self
            .agent
            .get(&self.url)
            .header("Accept", "application/json")
            .header("Authorization", authorization)
            .call()?;

        let status = response.status().as_u16();
        if matches!(status, 401 | 403) {
            return Ok(None);
        }
        if status >= 400 {
            return Err(AuthError::Status { status });
        }

        let body: IdentityResponse = response.into_body().read_json()?;
        Ok(Some(parse_role_list(&body.roles.join(","))))
    }
}

impl RoleResolver for IdentityRoleResolver {
    fn resolve(&self, headers: &HeaderMap) -> Result<RoleSet, AuthError> {
        let Some(authorization) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
            return Ok(RoleSet::new());
        };

        if let Some(roles) = self.cached(authorization) {
            return Ok(roles);
        }

        let roles = self
            .retry
            .run("identity lookup", || self.fetch(authorization))
            .map_err(AuthError::from)?;

        let roles = roles.unwrap_or_else(|| {
            tracing::debug!(url = %self.url, "Identity service rejected credentials");
            RoleSet::new()
        });
        self.remember(authorization, &roles);
        Ok(roles)
    }
}

/// Roles of the current caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct UserRoles(pub(crate) RoleSet);

impl FromRequestParts<Arc<AppState>> for UserRoles {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let resolver = Arc::clone(&state.roles);
        let headers = parts.headers.clone();
        let roles = tokio::task::spawn_blocking(move || resolver.resolve(&headers)).await??;
        Ok(Self(roles))
    }
}
