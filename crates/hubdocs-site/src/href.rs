//! Link target resolution.
//!
//! Page paths are site-relative with no leading slash (`guide/intro.html`).
//! Navigation hrefs may be root-relative (`/guide/intro.html`), relative to
//! the page carrying the tree (`../intro.html`), carry a fragment or query,
//! or point off-site (`https://example.com`).

/// Strip one leading `/`, any `#fragment` and any `?query`.
#[must_use]
pub fn normalize_path(href: &str) -> &str {
    let end = href.find(['#', '?']).unwrap_or(href.len());
    let path = &href[..end];
    path.strip_prefix('/').unwrap_or(path)
}

/// Whether `href` leaves the site (has a URL scheme or is protocol-relative).
#[must_use]
pub fn is_external(href: &str) -> bool {
    if href.starts_with("//") {
        return true;
    }
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Resolve `href` found on the page at `current_path` to a site path.
///
/// Returns `None` for external links. A fragment-only href resolves to
/// `current_path` itself.
#[must_use]
pub fn resolve_href(href: &str, current_path: &str) -> Option<String> {
    if is_external(href) {
        return None;
    }

    let current = normalize_path(current_path);
    let target = {
        let end = href.find(['#', '?']).unwrap_or(href.len());
        &href[..end]
    };

    if target.is_empty() {
        return Some(current.to_owned());
    }

    let joined = if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_owned()
    } else {
        match current.rsplit_once('/') {
            Some((dir, _)) => format!("{dir}/{target}"),
            None => target.to_owned(),
        }
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    Some(segments.join("/"))
}
