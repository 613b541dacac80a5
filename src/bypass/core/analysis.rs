//! Link post-processing helpers.
//!
//! Every link a strategy surfaces goes through [`resolve_link`] so callers only
//! ever see absolute `scheme://host/...` URLs.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Substrings that disqualify a captured link on hosts that pad their pages
/// with placeholder anchors.
const REJECTED_MARKERS: &[&str] = &["javascript:", "mailto:", "#", "void(0)"];

static ORIGIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://[^/]+)").expect("invalid origin regex"));

/// Build origin value from URL (`scheme://host[:port]`).
pub fn origin_from_url(url: &Url) -> String {
    let mut origin = format!("{}://{}", url.scheme(), url.host_str().unwrap_or(""));
    if let Some(port) = url.port() {
        origin.push(':');
        origin.push_str(&port.to_string());
    }
    origin
}

/// Leading `scheme://host` of a raw string, if it has one.
pub fn origin_of(raw: &str) -> Option<&str> {
    ORIGIN_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `true` when `link` contains any pseudo-link marker (`javascript:`,
/// `mailto:`, `#`, `void(0)`) anywhere. Stricter than [`is_pseudo_href`].
pub fn is_rejected_link(link: &str) -> bool {
    let lowered = link.to_ascii_lowercase();
    REJECTED_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// `true` for hrefs that never point at a resource: in-page fragments and
/// `javascript:` / `mailto:` URLs.
pub fn is_pseudo_href(href: &str) -> bool {
    let lowered = href.trim_start().to_ascii_lowercase();
    lowered.starts_with('#')
        || lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
}

/// Strip whitespace, stray quotes and HTML entities from a captured link.
pub fn clean_link(raw: &str) -> String {
    let trimmed = raw.trim().replace(['"', '\''], "");
    html_escape::decode_html_entities(&trimmed).into_owned()
}

/// Turn `href` into an absolute URL relative to `origin`.
///
/// Absolute URLs come back untouched and `/path` hrefs get the origin
/// prepended verbatim. Other relative forms are joined against the origin.
/// Pseudo hrefs and unparsable values yield `None`; fragments on real URLs
/// are kept.
pub fn resolve_link(origin: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || is_pseudo_href(href) {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return Some(href.to_string());
    }

    let base = origin.trim_end_matches('/');
    if let Some(rest) = href.strip_prefix("//") {
        let scheme = base.split("://").next().unwrap_or("https");
        return Some(format!("{scheme}://{rest}"));
    }

    if href.starts_with('/') {
        return Some(format!("{base}{href}"));
    }

    if href.contains(':') {
        // some other scheme (magnet:, tg:, data:...)
        return None;
    }

    Url::parse(&format!("{base}/"))
        .ok()?
        .join(href)
        .ok()
        .map(String::from)
}

/// Remove repeated URLs while keeping first-seen order.
pub fn dedupe_preserving_order<I>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Replace the origin of `url` with `new_origin`, keeping path and query.
pub fn swap_origin(url: &str, new_origin: &str) -> String {
    match origin_of(url) {
        Some(old) => url.replacen(old, new_origin.trim_end_matches('/'), 1),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_take_the_page_origin() {
        assert_eq!(
            resolve_link("https://example.com", "/path/to/file?id=1").as_deref(),
            Some("https://example.com/path/to/file?id=1")
        );
        assert_eq!(
            resolve_link("https://example.com/", "/path").as_deref(),
            Some("https://example.com/path")
        );
    }

    #[test]
    fn absolute_and_protocol_relative_links() {
        assert_eq!(
            resolve_link("https://example.com", "https://cdn.example.org/a.mkv").as_deref(),
            Some("https://cdn.example.org/a.mkv")
        );
        assert_eq!(
            resolve_link("https://example.com", "//cdn.example.org/a.mkv").as_deref(),
            Some("https://cdn.example.org/a.mkv")
        );
        assert_eq!(
            resolve_link("https://example.com", "file/abc").as_deref(),
            Some("https://example.com/file/abc")
        );
    }

    #[test]
    fn pseudo_links_are_rejected() {
        assert!(resolve_link("https://example.com", "javascript:void(0)").is_none());
        assert!(resolve_link("https://example.com", "mailto:a@b.c").is_none());
        assert!(resolve_link("https://example.com", "#top").is_none());
        assert!(resolve_link("https://example.com", "magnet:?xt=urn:btih:abc").is_none());
    }

    #[test]
    fn fragments_survive_on_real_urls() {
        assert_eq!(
            resolve_link("https://example.com", "https://mega.nz/file/AbCd#keyXYZ").as_deref(),
            Some("https://mega.nz/file/AbCd#keyXYZ")
        );
        assert_eq!(
            resolve_link("https://example.com", "/get/1#part2").as_deref(),
            Some("https://example.com/get/1#part2")
        );
        assert!(is_rejected_link("https://mega.nz/file/AbCd#keyXYZ"));
        assert!(!is_pseudo_href("https://mega.nz/file/AbCd#keyXYZ"));
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let links = vec![
            "https://a.example/1".to_string(),
            "https://b.example/2".to_string(),
            "https://a.example/1".to_string(),
        ];
        assert_eq!(
            dedupe_preserving_order(links),
            vec!["https://a.example/1", "https://b.example/2"]
        );
    }

    #[test]
    fn origin_helpers() {
        let url = Url::parse("http://127.0.0.1:8080/f/abc").unwrap();
        assert_eq!(origin_from_url(&url), "http://127.0.0.1:8080");
        assert_eq!(
            origin_of("https://new.gdflix.dev/file/xyz"),
            Some("https://new.gdflix.dev")
        );
        assert_eq!(
            swap_origin("https://gdflix.old/file/xyz", "https://gdflix.new/"),
            "https://gdflix.new/file/xyz"
        );
    }

    #[test]
    fn clean_link_decodes_entities() {
        assert_eq!(
            clean_link(" 'https://x.example/dl?a=1&amp;b=2' "),
            "https://x.example/dl?a=1&b=2"
        );
    }
}
