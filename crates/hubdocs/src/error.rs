//! CLI error types.

use hubdocs_config::ConfigError;
use hubdocs_index::RetryError;
use hubdocs_site::SiteError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Sync(#[from] RetryError<SiteError>),

    #[error("{0}")]
    Server(String),
}
