//! Paginated, role-filtered search over headings and sections.

use hubdocs_index::{IndexClient, SearchHit, SearchRequest};

use crate::access::AccessFilter;
use crate::error::SiteError;
use crate::model::{HeadingDocument, RoleSet, SearchResult, Section, SectionDocument};
use crate::repository::{IndexRepository, decode};

/// Which derived index a search reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchSource {
    /// Heading titles.
    Headings,
    /// Section titles and body text.
    Sections,
}

impl SearchSource {
    fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Headings => &["title"],
            Self::Sections => &["heading.title", "content"],
        }
    }

    /// Decode a hit, replacing matched fields with their highlight fragment.
    fn to_result(self, hit: SearchHit) -> Result<SearchResult, SiteError> {
        let SearchHit {
            source, highlight, ..
        } = hit;
        let fragment = |field: &str| highlight.get(field).and_then(|f| f.first()).cloned();

        match self {
            Self::Headings => {
                let mut doc: HeadingDocument = decode("heading", source)?;
                if let Some(title) = fragment("title") {
                    doc.heading.title = title;
                }
                Ok(SearchResult::Heading {
                    path: doc.path,
                    heading: doc.heading,
                })
            }
            Self::Sections => {
                let mut doc: SectionDocument = decode("section", source)?;
                if let Some(title) = fragment("heading.title") {
                    doc.heading.title = title;
                }
                if let Some(content) = fragment("content") {
                    doc.content = content;
                }
                Ok(SearchResult::Section {
                    path: doc.path,
                    section: Section {
                        heading: doc.heading,
                        content: doc.content,
                    },
                })
            }
        }
    }
}

/// Lazy sequence of result pages from one index.
///
/// No request is made until the first page is pulled. The sequence ends on
/// the first empty page or after the first error.
pub struct SearchPages<'a> {
    client: &'a dyn IndexClient,
    index: &'a str,
    source: SearchSource,
    query: String,
    page_size: usize,
    from: usize,
    done: bool,
}

impl<'a> SearchPages<'a> {
    pub(crate) fn new(
        client: &'a dyn IndexClient,
        index: &'a str,
        source: SearchSource,
        query: &str,
        page_size: usize,
    ) -> Self {
        let query = query.trim();
        Self {
            client,
            index,
            source,
            query: query.to_owned(),
            page_size: page_size.max(1),
            from: 0,
            done: query.is_empty(),
        }
    }
}

impl Iterator for SearchPages<'_> {
    type Item = Result<Vec<SearchResult>, SiteError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let request = SearchRequest::new(&self.query, self.source.fields(), self.from, self.page_size);
        let hits = match self.client.search(self.index, &request) {
            Ok(hits) => hits,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };

        if hits.is_empty() {
            self.done = true;
            return None;
        }

        self.from += hits.len();
        let source = self.source;
        Some(hits.into_iter().map(|hit| source.to_result(hit)).collect())
    }
}

/// Merges heading and section matches for one principal.
///
/// Headings rank before sections. Each source is pulled page by page and
/// filtered through the effective-roles snapshot until `limit` visible
/// results are collected, so sections are never queried when headings alone
/// fill the limit.
pub struct SearchAggregator<'a> {
    repository: &'a IndexRepository,
}

impl<'a> SearchAggregator<'a> {
    /// Create an aggregator over `repository`.
    #[must_use]
    pub fn new(repository: &'a IndexRepository) -> Self {
        Self { repository }
    }

    /// Up to `limit` results visible to `user_roles`.
    ///
    /// Blank queries and a zero limit return nothing without touching the
    /// index.
    ///
    /// # Errors
    ///
    /// Returns an error if a search request fails or the role snapshot is
    /// missing.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        user_roles: &RoleSet,
    ) -> Result<Vec<SearchResult>, SiteError> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let roles = self.repository.effective_roles()?;
        let filter = AccessFilter::new(&roles);

        let mut results = Vec::new();
        Self::collect(self.repository.search_headings(query), &filter, user_roles, limit, &mut results)?;
        if results.len() < limit {
            Self::collect(self.repository.search_sections(query), &filter, user_roles, limit, &mut results)?;
        }

        results.truncate(limit);
        Ok(results)
    }

    fn collect(
        pages: SearchPages<'_>,
        filter: &AccessFilter<'_>,
        user_roles: &RoleSet,
        limit: usize,
        results: &mut Vec<SearchResult>,
    ) -> Result<(), SiteError> {
        for page in pages {
            results.extend(filter.filter_search_results(page?, user_roles));
            if results.len() >= limit {
                break;
            }
        }
        Ok(())
    }
}
