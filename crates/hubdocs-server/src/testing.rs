//! Fixtures shared by the crate's tests.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use hubdocs_cache::MemoryCache;
use hubdocs_index::{MemoryIndex, RetryPolicy};
use hubdocs_site::{
    HeadingEntry, IndexRepository, MemorySource, Page, PageMeta, RepositoryConfig, Section,
    TocEntry,
};

use crate::auth::HeaderRoleResolver;
use crate::state::{AppState, SearchLimits};

/// Header the test resolver reads roles from.
pub(crate) const ROLES_HEADER: &str = "x-hubdocs-roles";

/// A page with no headings.
pub(crate) fn page(path: &str, hash: &str) -> Page {
    Page {
        path: path.to_owned(),
        hash: hash.to_owned(),
        html: format!("<p>{path}</p>"),
        meta: PageMeta::default(),
        sections: Vec::new(),
        headings: Vec::new(),
        tocs: Vec::new(),
    }
}

/// A page with one level-2 heading and its section.
pub(crate) fn page_with_heading(path: &str, hash: &str, slug: &str) -> Page {
    let heading = HeadingEntry {
        level: 2,
        title: slug.to_owned(),
        slug: slug.to_owned(),
    };
    Page {
        sections: vec![Section {
            heading: heading.clone(),
            content: format!("{slug} body"),
        }],
        headings: vec![heading],
        ..page(path, hash)
    }
}

/// The navigation page listing `entries` as `(level, href, title)`.
pub(crate) fn navigation(entries: &[(u32, &str, &str)]) -> Page {
    let toc = entries
        .iter()
        .map(|(level, href, title)| TocEntry::new(*level, *href, *title))
        .collect();
    Page {
        tocs: vec![toc],
        ..page("toc.html", "nav")
    }
}

/// Repository with prefix `test` over an in-memory index.
pub(crate) fn repository(source: MemorySource) -> (Arc<MemoryIndex>, Arc<IndexRepository>) {
    let index = Arc::new(MemoryIndex::new());
    let repository = IndexRepository::new(
        index.clone(),
        Arc::new(source),
        Arc::new(MemoryCache::new()),
        RepositoryConfig {
            prefix: "test".to_owned(),
            search_page_size: 2,
            bulk_chunk_size: 20,
            write_retry: RetryPolicy::new(1, Duration::ZERO),
        },
    );
    (index, Arc::new(repository))
}

/// Handler state over `repository`, reading roles from [`ROLES_HEADER`].
pub(crate) fn state(repository: Arc<IndexRepository>) -> Arc<AppState> {
    Arc::new(AppState {
        repository,
        roles: Arc::new(HeaderRoleResolver::new(ROLES_HEADER).unwrap()),
        search: SearchLimits {
            default_limit: 10,
            max_limit: 20,
        },
    })
}

/// Loopback identity service answering canned `(status, body)` replies in
/// order, one connection per request.
pub(crate) struct IdentityStub {
    url: String,
    hits: Arc<AtomicUsize>,
}

impl IdentityStub {
    pub(crate) fn start(replies: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/me", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for (status, body) in replies {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                // GET requests carry no body; the head ends at the blank line.
                {
                    let mut reader = BufReader::new(&stream);
                    let mut line = String::new();
                    while reader.read_line(&mut line).unwrap() > 0 && line != "\r\n" {
                        line.clear();
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let reply = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).unwrap();
            }
        });

        Self { url, hits }
    }

    pub(crate) fn url(&self) -> String {
        self.url.clone()
    }

    /// Requests answered so far.
    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}
