//! Previous and next links along the main navigation.

use serde::Serialize;

use crate::href::{normalize_path, resolve_href};
use crate::model::TocEntry;

/// Neighbours of a page in a navigation tree.
///
/// Serialized with `null` for absent fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    /// Level of the page's own entry, `None` when the page is not listed.
    pub level: Option<u32>,
    /// Entry right before the page.
    pub previous: Option<TocEntry>,
    /// Entry right after the page.
    pub next: Option<TocEntry>,
}

impl PageLinks {
    /// Locate `path` in `toc` and take its neighbours.
    ///
    /// Hrefs are resolved against `toc_path`, the page carrying the tree.
    /// The first matching entry wins. Neighbours are taken as listed, so
    /// filter the tree for the caller first.
    #[must_use]
    pub fn find(toc: &[TocEntry], path: &str, toc_path: &str) -> Self {
        let path = normalize_path(path);
        let Some(position) = toc.iter().position(|entry| {
            resolve_href(&entry.href, toc_path).is_some_and(|target| target == path)
        }) else {
            return Self::default();
        };

        Self {
            level: Some(toc[position].level),
            previous: position.checked_sub(1).map(|i| toc[i].clone()),
            next: toc.get(position + 1).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::model::NAVIGATION_PAGE;

    fn toc() -> Vec<TocEntry> {
        vec![
            TocEntry::new(1, "guide/index.html", "Guide"),
            TocEntry::new(2, "/guide/install.html", "Install"),
            TocEntry::new(2, "guide/usage.html#top", "Usage"),
            TocEntry::new(1, "https://status.example.com", "Status"),
        ]
    }

    #[test]
    fn test_middle_entry_has_both_neighbours() {
        let links = PageLinks::find(&toc(), "guide/install.html", NAVIGATION_PAGE);

        assert_eq!(links.level, Some(2));
        assert_eq!(links.previous, Some(TocEntry::new(1, "guide/index.html", "Guide")));
        assert_eq!(links.next, Some(TocEntry::new(2, "guide/usage.html#top", "Usage")));
    }

    #[test]
    fn test_first_entry_has_no_previous() {
        let links = PageLinks::find(&toc(), "/guide/index.html", NAVIGATION_PAGE);

        assert_eq!(links.level, Some(1));
        assert_eq!(links.previous, None);
        assert_eq!(links.next.map(|e| e.title), Some("Install".to_owned()));
    }

    #[test]
    fn test_fragment_href_matches_and_external_neighbour_is_kept() {
        let links = PageLinks::find(&toc(), "guide/usage.html", NAVIGATION_PAGE);

        assert_eq!(links.next.map(|e| e.href), Some("https://status.example.com".to_owned()));
    }

    #[test]
    fn test_unlisted_page_has_no_links() {
        let links = PageLinks::find(&toc(), "members.html", NAVIGATION_PAGE);

        assert_eq!(links, PageLinks::default());
    }

    #[test]
    fn test_relative_hrefs_resolve_against_tree_page() {
        let toc = vec![
            TocEntry::new(1, "intro.html", "Intro"),
            TocEntry::new(1, "../setup.html", "Setup"),
        ];

        let links = PageLinks::find(&toc, "setup.html", "guide/toc.html");

        assert_eq!(links.previous.map(|e| e.title), Some("Intro".to_owned()));
    }

    #[test]
    fn test_missing_links_serialize_as_null() {
        let value = serde_json::to_value(PageLinks::default()).unwrap();

        assert_eq!(value, json!({ "level": null, "previous": null, "next": null }));
    }
}
