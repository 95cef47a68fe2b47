//! Role inheritance over the main navigation tree.
//!
//! A page's effective roles are the intersection of its own declared roles
//! with the declared roles of every navigation ancestor, ignoring empty
//! (public) declarations. The tree is a flat level-tagged sequence, so
//! ancestors are found by a backward scan rather than parent links.

use crate::href::resolve_href;
use crate::model::{RoleSet, RolesByPath, TocEntry};

/// Compute effective roles for every declared path and every internal
/// navigation target.
#[must_use]
pub fn effective_roles(toc: &[TocEntry], raw: &RolesByPath) -> RolesByPath {
    let targets: Vec<Option<String>> = toc.iter().map(nav_target).collect();

    let nav_paths = targets.iter().flatten();
    let mut result = RolesByPath::new();
    for path in raw.keys().chain(nav_paths) {
        if !result.contains_key(path) {
            let roles = resolve_with_targets(path, toc, &targets, raw);
            result.insert(path.clone(), roles);
        }
    }
    result
}

/// Effective roles of a single path.
///
/// A path without a declaration is public. A declared path that does not
/// appear in the navigation tree keeps its declaration unchanged.
#[must_use]
pub fn effective_roles_for(path: &str, toc: &[TocEntry], raw: &RolesByPath) -> RoleSet {
    let targets: Vec<Option<String>> = toc.iter().map(nav_target).collect();
    resolve_with_targets(path, toc, &targets, raw)
}

fn resolve_with_targets(
    path: &str,
    toc: &[TocEntry],
    targets: &[Option<String>],
    raw: &RolesByPath,
) -> RoleSet {
    let Some(own) = raw.get(path) else {
        return RoleSet::new();
    };

    let Some(position) = targets.iter().position(|t| t.as_deref() == Some(path)) else {
        return own.clone();
    };

    let ancestors = ancestor_positions(toc, position)
        .into_iter()
        .filter_map(|i| targets[i].as_deref())
        .filter_map(|ancestor| raw.get(ancestor));

    intersect_restrictions(std::iter::once(own).chain(ancestors))
}

/// Site path a navigation entry points to, `None` for external links.
fn nav_target(entry: &TocEntry) -> Option<String> {
    resolve_href(&entry.href, "")
}

/// Positions of the structural ancestors of `toc[position]`, nearest first.
fn ancestor_positions(toc: &[TocEntry], position: usize) -> Vec<usize> {
    let mut ancestors = Vec::new();
    let mut level = toc[position].level;

    for (i, entry) in toc[..position].iter().enumerate().rev() {
        if level <= 1 {
            break;
        }
        if entry.level < level {
            ancestors.push(i);
            level = entry.level;
        }
    }

    ancestors
}

/// Intersect all non-empty sets. No non-empty set means public.
fn intersect_restrictions<'a>(sets: impl IntoIterator<Item = &'a RoleSet>) -> RoleSet {
    let mut restricted: Option<RoleSet> = None;
    for set in sets.into_iter().filter(|s| !s.is_empty()) {
        restricted = Some(match restricted {
            None => set.clone(),
            Some(acc) => acc.intersection(set).copied().collect(),
        });
    }
    restricted.unwrap_or_default()
}
