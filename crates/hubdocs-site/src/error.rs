//! Site error type.

use hubdocs_index::IndexError;

use crate::source::SourceError;

/// Public message of [`SiteError::SyncInProgress`].
pub const SYNC_IN_PROGRESS: &str = "Sync in progress";

/// Error from sync, lookups or search.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Index request failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Content source could not be read.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A stored document does not have the expected shape.
    #[error("malformed {kind} document in index: {source}")]
    Malformed {
        /// What was being decoded.
        kind: &'static str,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Indexed content is not (yet) consistent, e.g. before the first sync.
    #[error("{reason}")]
    SyncInProgress {
        /// Internal diagnostic.
        reason: String,
    },
}

impl SiteError {
    pub(crate) fn sync_in_progress(reason: impl Into<String>) -> Self {
        Self::SyncInProgress {
            reason: reason.into(),
        }
    }

    /// Message safe to show to end users, `None` for internal faults.
    #[must_use]
    pub fn public_message(&self) -> Option<&'static str> {
        match self {
            Self::SyncInProgress { .. } => Some(SYNC_IN_PROGRESS),
            _ => None,
        }
    }

    /// Whether the error is expected while the index is still being filled.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SyncInProgress { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_in_progress_has_public_message() {
        let err = SiteError::sync_in_progress("toc.html not indexed");

        assert_eq!(err.to_string(), "toc.html not indexed");
        assert_eq!(err.public_message(), Some("Sync in progress"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_internal_errors_have_no_public_message() {
        let err = SiteError::from(SourceError::PageNotFound("a.html".to_owned()));

        assert_eq!(err.public_message(), None);
        assert!(!err.is_recoverable());
    }
}
