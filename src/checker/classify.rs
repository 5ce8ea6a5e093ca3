// src/checker/classify.rs
// =============================================================================
// Sorts raw href values into the three buckets the crawler cares about.
//
// Rules:
// - "#...", "mailto:", "tel:", "javascript:" are ignored
// - "/path" (but not "//host") is internal; the fragment is stripped,
//   the query string is kept
// - "http://", "https://" and protocol-relative "//host" are external;
//   "//host" becomes "https://host"
// - anything else (relative paths like "about/", "data:" URLs) is ignored
//
// An absolute URL pointing at the site's own host is still external here.
// That is a known gap in coverage, not something this function corrects.
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// Same-origin path, fragment removed
    Internal(String),
    /// Absolute URL on some other (or the same) host
    External(String),
    Ignored,
}

const IGNORED_PREFIXES: &[&str] = &["#", "mailto:", "tel:", "javascript:"];

pub fn classify_href(href: &str) -> LinkKind {
    let href = href.trim();

    if href.is_empty() || IGNORED_PREFIXES.iter().any(|p| starts_with_ignore_case(href, p)) {
        return LinkKind::Ignored;
    }

    if let Some(rest) = href.strip_prefix("//") {
        return LinkKind::External(format!("https://{rest}"));
    }

    if href.starts_with('/') {
        let path = match href.find('#') {
            Some(idx) => &href[..idx],
            None => href,
        };
        return LinkKind::Internal(path.to_string());
    }

    if starts_with_ignore_case(href, "http://") || starts_with_ignore_case(href, "https://") {
        return LinkKind::External(href.to_string());
    }

    LinkKind::Ignored
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}
