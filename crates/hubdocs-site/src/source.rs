//! Post-processor output: the input of record for sync.
//!
//! The post-processor writes one JSON document per page plus two snapshots:
//!
//! ```text
//! build/
//! ├── hashes.json            # HashByPath
//! ├── roles.json             # raw RolesByPath
//! ├── toc.html.json          # navigation page
//! └── guide/intro.html.json  # one Page per path
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::model::{HashByPath, Page, RolesByPath};

/// File holding the content hash snapshot.
pub const HASHES_FILE: &str = "hashes.json";

/// File holding the raw role declarations.
pub const ROLES_FILE: &str = "roles.json";

/// Content source error.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Page listed in the hash snapshot but not present.
    #[error("page not found in content source: {0}")]
    PageNotFound(String),

    /// Page path escapes the content directory.
    #[error("invalid page path: {0}")]
    InvalidPath(String),

    /// Reading a file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A file is not valid JSON of the expected shape.
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        /// File that could not be parsed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Read access to the post-processor output.
pub trait ContentSource: Send + Sync {
    /// Current content hashes.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read.
    fn hashes(&self) -> Result<HashByPath, SourceError>;

    /// Raw (declared) roles.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot exists but cannot be read.
    fn roles(&self) -> Result<RolesByPath, SourceError>;

    /// Load one page.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::PageNotFound`] if the page does not exist.
    fn page(&self, path: &str) -> Result<Page, SourceError>;
}

/// [`ContentSource`] over a post-processor output directory.
#[derive(Clone, Debug)]
pub struct FsContentSource {
    dir: PathBuf,
}

impl FsContentSource {
    /// Create a source reading from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Content directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and parse a JSON file, `None` if it does not exist.
    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SourceError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SourceError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| SourceError::Json {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Reject paths that would leave the content directory.
    fn validate_path(path: &str) -> Result<(), SourceError> {
        if path.is_empty() || path.split('/').any(|segment| segment == "..") {
            return Err(SourceError::InvalidPath(path.to_owned()));
        }
        Ok(())
    }
}

impl ContentSource for FsContentSource {
    fn hashes(&self) -> Result<HashByPath, SourceError> {
        Ok(Self::read_json(&self.dir.join(HASHES_FILE))?.unwrap_or_default())
    }

    fn roles(&self) -> Result<RolesByPath, SourceError> {
        Ok(Self::read_json(&self.dir.join(ROLES_FILE))?.unwrap_or_default())
    }

    fn page(&self, path: &str) -> Result<Page, SourceError> {
        let path = path.trim_start_matches('/');
        Self::validate_path(path)?;

        let file = self.dir.join(format!("{path}.json"));
        Self::read_json(&file)?.ok_or_else(|| SourceError::PageNotFound(path.to_owned()))
    }
}

#[cfg(any(test, feature = "mock"))]
pub use memory::MemorySource;

#[cfg(any(test, feature = "mock"))]
mod memory {
    use std::collections::BTreeMap;
    use std::sync::RwLock;

    use super::{ContentSource, SourceError};
    use crate::model::{HashByPath, Page, RoleSet, RolesByPath};

    /// In-memory [`ContentSource`] for tests.
    ///
    /// Adding a page records its hash; tests mutate the source between
    /// syncs to simulate a rebuild.
    #[derive(Debug, Default)]
    pub struct MemorySource {
        pages: RwLock<BTreeMap<String, Page>>,
        roles: RwLock<RolesByPath>,
    }

    impl MemorySource {
        /// Create an empty source.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a page (builder form).
        #[must_use]
        pub fn with_page(self, page: Page) -> Self {
            self.put_page(page);
            self
        }

        /// Declare roles for a path (builder form).
        #[must_use]
        pub fn with_roles(self, path: &str, roles: RoleSet) -> Self {
            self.set_roles(path, roles);
            self
        }

        /// Add or replace a page.
        ///
        /// # Panics
        ///
        /// Panics if the internal lock is poisoned.
        pub fn put_page(&self, page: Page) {
            self.pages.write().unwrap().insert(page.path.clone(), page);
        }

        /// Remove a page.
        ///
        /// # Panics
        ///
        /// Panics if the internal lock is poisoned.
        pub fn remove_page(&self, path: &str) {
            self.pages.write().unwrap().remove(path);
        }

        /// Declare roles for a path.
        ///
        /// # Panics
        ///
        /// Panics if the internal lock is poisoned.
        pub fn set_roles(&self, path: &str, roles: RoleSet) {
            self.roles.write().unwrap().insert(path.to_owned(), roles);
        }
    }

    impl ContentSource for MemorySource {
        fn hashes(&self) -> Result<HashByPath, SourceError> {
            Ok(self
                .pages
                .read()
                .unwrap()
                .values()
                .map(|page| (page.path.clone(), page.hash.clone()))
                .collect())
        }

        fn roles(&self) -> Result<RolesByPath, SourceError> {
            Ok(self.roles.read().unwrap().clone())
        }

        fn page(&self, path: &str) -> Result<Page, SourceError> {
            self.pages
                .read()
                .unwrap()
                .get(path.trim_start_matches('/'))
                .cloned()
                .ok_or_else(|| SourceError::PageNotFound(path.to_owned()))
        }
    }
}
