//! Documents exchanged with the post-processor and stored in the index.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Path of the page whose first toc is the main navigation tree.
pub const NAVIGATION_PAGE: &str = "toc.html";

/// Principal role. The set is closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Any signed-in user.
    User,
    /// Site administrator.
    Admin,
    /// Hub administrator.
    HubAdmin,
    /// Group administrator.
    GroupAdmin,
}

impl Role {
    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::HubAdmin => "hub-admin",
            Self::GroupAdmin => "group-admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role name.
#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "hub-admin" => Ok(Self::HubAdmin),
            "group-admin" => Ok(Self::GroupAdmin),
            other => Err(UnknownRole(other.to_owned())),
        }
    }
}

/// Set of roles. Empty means "visible to everyone".
pub type RoleSet = BTreeSet<Role>;

/// Role sets keyed by path (no leading slash).
pub type RolesByPath = BTreeMap<String, RoleSet>;

/// Content hashes keyed by path.
pub type HashByPath = BTreeMap<String, String>;

/// One entry of a flattened navigation tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Nesting level, starting at 1.
    pub level: u32,
    /// Link target, relative or absolute.
    pub href: String,
    /// Link text.
    pub title: String,
}

impl TocEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(level: u32, href: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            level,
            href: href.into(),
            title: title.into(),
        }
    }
}

/// Depth-first flattening of a navigation tree.
pub type Toc = Vec<TocEntry>;

/// A heading inside a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingEntry {
    /// Heading level (1-6).
    pub level: u32,
    /// Heading text.
    pub title: String,
    /// Anchor id, unique within the page.
    pub slug: String,
}

/// A heading together with the text that follows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading that opens the section.
    pub heading: HeadingEntry,
    /// Plain text of the section body.
    pub content: String,
}

/// Page flags set by front matter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageMeta {
    /// Declared (raw) roles.
    pub roles: Vec<Role>,
    /// Render previous/next links under the page.
    pub show_footer_navigation: bool,
    /// Render without side columns.
    pub full_width: bool,
}

/// A rendered page as produced by the post-processor.
///
/// Immutable for a given `hash`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Site-relative `.html` path, no leading slash.
    pub path: String,
    /// Content hash.
    pub hash: String,
    /// Rendered HTML body.
    pub html: String,
    /// Front matter flags.
    #[serde(default)]
    pub meta: PageMeta,
    /// Sections, in document order.
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Headings, in document order.
    #[serde(default)]
    pub headings: Vec<HeadingEntry>,
    /// Navigation trees embedded in the page.
    #[serde(default)]
    pub tocs: Vec<Toc>,
}

/// Stored form of a [`Section`] in the sections index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SectionDocument {
    pub(crate) path: String,
    pub(crate) heading: HeadingEntry,
    pub(crate) content: String,
}

/// Stored form of a [`HeadingEntry`] in the headings index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HeadingDocument {
    pub(crate) path: String,
    #[serde(flatten)]
    pub(crate) heading: HeadingEntry,
}

/// A search hit resolved to its owning page.
///
/// Matched fields carry highlight markup (`<em>`) in place of the stored text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SearchResult {
    /// A matching heading.
    Heading {
        /// Owning page path.
        path: String,
        /// The heading.
        #[serde(flatten)]
        heading: HeadingEntry,
    },
    /// A matching section.
    Section {
        /// Owning page path.
        path: String,
        /// The section.
        #[serde(flatten)]
        section: Section,
    },
}

impl SearchResult {
    /// Owning page path.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Heading { path, .. } | Self::Section { path, .. } => path,
        }
    }

    /// Anchor of the matched heading.
    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            Self::Heading { heading, .. } => &heading.slug,
            Self::Section { section, .. } => &section.heading.slug,
        }
    }
}

/// Parse a comma-separated role list, skipping blanks and unknown names.
#[must_use]
pub fn parse_role_list(value: &str) -> RoleSet {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(role) => Some(role),
            Err(err) => {
                tracing::debug!(%err, "ignoring role");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_role_wire_names() {
        let roles: Vec<Role> =
            serde_json::from_value(json!(["user", "admin", "hub-admin", "group-admin"])).unwrap();
        assert_eq!(
            roles,
            vec![Role::User, Role::Admin, Role::HubAdmin, Role::GroupAdmin]
        );
        assert_eq!(serde_json::to_value(Role::HubAdmin).unwrap(), json!("hub-admin"));
        assert_eq!("group-admin".parse::<Role>().unwrap(), Role::GroupAdmin);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_page_deserializes_post_processor_output() {
        let page: Page = serde_json::from_value(json!({
            "path": "guide/intro.html",
            "hash": "abc123",
            "html": "<h1 id=\"intro\">Intro</h1>",
            "meta": { "roles": ["admin"], "showFooterNavigation": true, "fullWidth": false },
            "sections": [{
                "heading": { "level": 1, "title": "Intro", "slug": "intro" },
                "content": "Welcome"
            }],
            "headings": [{ "level": 1, "title": "Intro", "slug": "intro" }],
            "tocs": [[{ "level": 1, "href": "#intro", "title": "Intro" }]]
        }))
        .unwrap();

        assert_eq!(page.meta.roles, vec![Role::Admin]);
        assert!(page.meta.show_footer_navigation);
        assert_eq!(page.sections[0].heading.slug, "intro");
        assert_eq!(page.tocs[0][0], TocEntry::new(1, "#intro", "Intro"));
    }

    #[test]
    fn test_page_optional_fields_default() {
        let page: Page = serde_json::from_value(json!({
            "path": "a.html", "hash": "h", "html": ""
        }))
        .unwrap();

        assert_eq!(page.meta, PageMeta::default());
        assert!(page.sections.is_empty());
        assert!(page.tocs.is_empty());
    }

    #[test]
    fn test_search_result_serialization() {
        let result = SearchResult::Heading {
            path: "a.html".to_owned(),
            heading: HeadingEntry {
                level: 2,
                title: "<em>Install</em>".to_owned(),
                slug: "install".to_owned(),
            },
        };

        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(
            value,
            json!({
                "kind": "heading",
                "path": "a.html",
                "level": 2,
                "title": "<em>Install</em>",
                "slug": "install"
            })
        );
        assert_eq!(result.slug(), "install");
    }

    #[test]
    fn test_heading_document_is_flat() {
        let doc = HeadingDocument {
            path: "a.html".to_owned(),
            heading: HeadingEntry {
                level: 1,
                title: "A".to_owned(),
                slug: "a".to_owned(),
            },
        };

        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({ "path": "a.html", "level": 1, "title": "A", "slug": "a" })
        );
    }

    #[test]
    fn test_parse_role_list() {
        let roles = parse_role_list(" admin, hub-admin,,root , user");
        assert_eq!(
            roles,
            RoleSet::from([Role::User, Role::Admin, Role::HubAdmin])
        );
        assert!(parse_role_list("").is_empty());
    }
}
