//! HTTP request handlers.
//!
//! Repository calls block on the index service, so handlers run them on the
//! blocking pool through [`blocking`].

pub(crate) mod health;
pub(crate) mod navigation;
pub(crate) mod pages;
pub(crate) mod search;
pub(crate) mod sync;

use crate::error::ServerError;

/// Run blocking repository work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ServerError>
where
    F: FnOnce() -> Result<T, ServerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
