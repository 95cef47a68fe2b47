//! Role-based visibility of navigation entries and search results.

use crate::href::{is_external, resolve_href};
use crate::model::{RoleSet, RolesByPath, SearchResult, TocEntry};

/// Whether a principal holding `user_roles` may see content restricted to
/// `effective`.
///
/// Empty `effective` is public.
#[must_use]
pub fn can_see(effective: &RoleSet, user_roles: &RoleSet) -> bool {
    effective.is_empty() || !effective.is_disjoint(user_roles)
}

/// Visibility filter over an effective-roles snapshot.
///
/// Paths missing from the snapshot are public.
#[derive(Clone, Copy, Debug)]
pub struct AccessFilter<'a> {
    roles: &'a RolesByPath,
}

impl<'a> AccessFilter<'a> {
    /// Create a filter over effective roles.
    #[must_use]
    pub fn new(roles: &'a RolesByPath) -> Self {
        Self { roles }
    }

    /// Effective roles of a canonical path.
    #[must_use]
    pub fn roles_for(&self, path: &str) -> RoleSet {
        self.roles
            .get(path.trim_start_matches('/'))
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `path` is visible to `user_roles`.
    #[must_use]
    pub fn can_see(&self, path: &str, user_roles: &RoleSet) -> bool {
        match self.roles.get(path.trim_start_matches('/')) {
            Some(effective) => can_see(effective, user_roles),
            None => true,
        }
    }

    /// Keep the navigation entries visible to `user_roles`.
    ///
    /// Internal hrefs are resolved against the directory of `current_path`
    /// before the lookup. External links always survive. Order and levels
    /// are untouched.
    #[must_use]
    pub fn filter_tree(
        &self,
        tree: &[TocEntry],
        user_roles: &RoleSet,
        current_path: &str,
    ) -> Vec<TocEntry> {
        tree.iter()
            .filter(|entry| {
                if is_external(&entry.href) {
                    return true;
                }
                resolve_href(&entry.href, current_path)
                    .is_none_or(|target| self.can_see(&target, user_roles))
            })
            .cloned()
            .collect()
    }

    /// Keep the search results whose page is visible to `user_roles`.
    #[must_use]
    pub fn filter_search_results(
        &self,
        results: Vec<SearchResult>,
        user_roles: &RoleSet,
    ) -> Vec<SearchResult> {
        results
            .into_iter()
            .filter(|result| self.can_see(result.path(), user_roles))
            .collect()
    }
}
