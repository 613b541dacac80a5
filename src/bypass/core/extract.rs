//! Layered link extraction.
//!
//! A strategy describes where links live as an ordered [`TierChain`]: CSS
//! selection first, then inline-script assignment patterns, then broad
//! URL-shaped scanning of the raw body. Two policies consume a chain:
//! [`TierChain::first_acceptable`] stops at the first usable link (tier order,
//! then document order) and [`TierChain::collect_all`] merges every tier.
//! Chains built with [`TierChain::rejecting_pseudo_links`] additionally drop
//! any candidate that merely contains a pseudo-link marker such as `#`.

use once_cell::unsync::OnceCell;
use regex::{Regex, RegexBuilder};
use scraper::{Html, Selector};

use super::analysis::{clean_link, dedupe_preserving_order, is_rejected_link, resolve_link};

/// A fetched page plus the origin used to absolutize its links.
pub struct Page<'a> {
    body: &'a str,
    origin: String,
    document: OnceCell<Html>,
}

impl<'a> Page<'a> {
    pub fn new(body: &'a str, origin: impl Into<String>) -> Self {
        Self {
            body,
            origin: origin.into(),
            document: OnceCell::new(),
        }
    }

    pub fn body(&self) -> &str {
        self.body
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Parsed DOM, built on first use.
    pub fn document(&self) -> &Html {
        self.document.get_or_init(|| Html::parse_document(self.body))
    }
}

/// One independently testable way of finding candidate links.
pub trait ExtractionTier: Send + Sync {
    fn name(&self) -> &str;

    /// Raw candidates in document order, before cleaning and resolution.
    fn extract(&self, page: &Page<'_>) -> Vec<String>;

    /// Only accept candidates that are already absolute `http(s)` URLs.
    fn requires_absolute(&self) -> bool {
        false
    }
}

/// Reads an attribute from every element matching a CSS selector.
pub struct SelectorTier {
    name: String,
    selector: Selector,
    attribute: &'static str,
    require_absolute: bool,
}

impl SelectorTier {
    /// Panics on an invalid selector; tiers are built from static tables.
    pub fn new(name: impl Into<String>, css: &str, attribute: &'static str) -> Self {
        let selector = Selector::parse(css)
            .unwrap_or_else(|err| panic!("invalid extraction selector `{css}`: {err:?}"));
        Self {
            name: name.into(),
            selector,
            attribute,
            require_absolute: false,
        }
    }

    pub fn absolute_only(mut self) -> Self {
        self.require_absolute = true;
        self
    }
}

impl ExtractionTier for SelectorTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, page: &Page<'_>) -> Vec<String> {
        page.document()
            .select(&self.selector)
            .filter_map(|element| element.value().attr(self.attribute))
            .map(str::to_string)
            .collect()
    }

    fn requires_absolute(&self) -> bool {
        self.require_absolute
    }
}

/// Which part of a regex match is the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    Whole,
    Group(usize),
}

/// Ordered regex list scanned over the raw body.
pub struct PatternTier {
    name: String,
    patterns: Vec<Regex>,
    capture: Capture,
    require_absolute: bool,
}

impl PatternTier {
    /// Case-insensitive patterns. Panics on an invalid regex.
    pub fn new(name: impl Into<String>, raw_patterns: &[&str], capture: Capture) -> Self {
        Self::build(name, raw_patterns, capture, true)
    }

    /// Case-sensitive variant for sites whose markers are exact.
    pub fn case_sensitive(name: impl Into<String>, raw_patterns: &[&str], capture: Capture) -> Self {
        Self::build(name, raw_patterns, capture, false)
    }

    fn build(
        name: impl Into<String>,
        raw_patterns: &[&str],
        capture: Capture,
        case_insensitive: bool,
    ) -> Self {
        let patterns = raw_patterns
            .iter()
            .map(|pattern| build_regex(pattern, case_insensitive))
            .collect();
        Self {
            name: name.into(),
            patterns,
            capture,
            require_absolute: false,
        }
    }

    pub fn absolute_only(mut self) -> Self {
        self.require_absolute = true;
        self
    }
}

impl ExtractionTier for PatternTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, page: &Page<'_>) -> Vec<String> {
        let mut found = Vec::new();
        for regex in &self.patterns {
            for caps in regex.captures_iter(page.body()) {
                let matched = match self.capture {
                    Capture::Whole => caps.get(0),
                    Capture::Group(idx) => caps.get(idx),
                };
                if let Some(m) = matched {
                    found.push(m.as_str().to_string());
                }
            }
        }
        found
    }

    fn requires_absolute(&self) -> bool {
        self.require_absolute
    }
}

/// Absolute URLs embedded in the body of a named inline JS function.
pub struct ScriptBodyTier {
    name: String,
    function: Regex,
}

static EMBEDDED_URL_RE: once_cell::sync::Lazy<Regex> = once_cell::sync::Lazy::new(|| {
    Regex::new(r#"https?://[^\s"'<>]+"#).expect("invalid embedded url regex")
});

impl ScriptBodyTier {
    pub fn new(function_name: &str) -> Self {
        let pattern = format!(
            r"function\s+{}\s*\(\)\s*\{{([^}}]+)\}}",
            regex::escape(function_name)
        );
        Self {
            name: format!("script:{function_name}"),
            function: RegexBuilder::new(&pattern)
                .dot_matches_new_line(true)
                .build()
                .expect("invalid script body regex"),
        }
    }
}

impl ExtractionTier for ScriptBodyTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, page: &Page<'_>) -> Vec<String> {
        let Some(body) = self
            .function
            .captures(page.body())
            .and_then(|caps| caps.get(1))
        else {
            return Vec::new();
        };

        EMBEDDED_URL_RE
            .find_iter(body.as_str())
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Ordered extraction tiers.
#[derive(Default)]
pub struct TierChain {
    tiers: Vec<Box<dyn ExtractionTier>>,
    reject_pseudo_links: bool,
}

impl TierChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(mut self, tier: impl ExtractionTier + 'static) -> Self {
        self.tiers.push(Box::new(tier));
        self
    }

    /// Skip candidates containing `javascript:`, `mailto:`, `#` or `void(0)`.
    pub fn rejecting_pseudo_links(mut self) -> Self {
        self.reject_pseudo_links = true;
        self
    }

    /// Append every tier of `other` after the current ones.
    pub fn extend(mut self, other: TierChain) -> Self {
        self.tiers.extend(other.tiers);
        self.reject_pseudo_links |= other.reject_pseudo_links;
        self
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// First link that survives cleaning, filtering and resolution.
    pub fn first_acceptable(&self, page: &Page<'_>) -> Option<String> {
        self.tiers.iter().find_map(|tier| {
            let hit = tier
                .extract(page)
                .into_iter()
                .find_map(|raw| self.accept(tier.as_ref(), page, &raw));
            if let Some(ref link) = hit {
                log::debug!("tier '{}' produced {}", tier.name(), link);
            }
            hit
        })
    }

    /// Every usable link from every tier, de-duplicated in discovery order.
    pub fn collect_all(&self, page: &Page<'_>) -> Vec<String> {
        let links = self.tiers.iter().flat_map(|tier| {
            let accepted: Vec<String> = tier
                .extract(page)
                .into_iter()
                .filter_map(|raw| self.accept(tier.as_ref(), page, &raw))
                .collect();
            if !accepted.is_empty() {
                log::debug!("tier '{}' produced {} link(s)", tier.name(), accepted.len());
            }
            accepted
        });
        dedupe_preserving_order(links)
    }

    fn accept(&self, tier: &dyn ExtractionTier, page: &Page<'_>, raw: &str) -> Option<String> {
        let cleaned = clean_link(raw);
        if cleaned.is_empty() || (self.reject_pseudo_links && is_rejected_link(&cleaned)) {
            return None;
        }
        if tier.requires_absolute() && !cleaned.to_ascii_lowercase().starts_with("http") {
            return None;
        }
        resolve_link(page.origin(), &cleaned)
    }
}

fn build_regex(pattern: &str, case_insensitive: bool) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .unwrap_or_else(|err| panic!("invalid extraction regex `{}`: {}", pattern, err))
}

/// `window.location = "..."`, `window.open("...")`, `location.href = "..."`.
pub const SCRIPT_REDIRECT_PATTERNS: &[&str] = &[
    r#"window\.location\s*=\s*["']([^"']+)["']"#,
    r#"window\.open\s*\(\s*["']([^"']+)["']"#,
    r#"location\.href\s*=\s*["']([^"']+)["']"#,
];

/// JS variable assignments that commonly hold the final link.
pub const SCRIPT_VARIABLE_PATTERNS: &[&str] = &[
    r#"var\s+(?:url|link|download|file)\s*=\s*['"]([^'"]+)['"]"#,
    r#"(?:url|link|download|file)\s*[:=]\s*['"]([^'"]+)['"]"#,
    r#"location\.href\s*=\s*['"]([^'"]+)['"]"#,
    r#"window\.open\s*\(\s*['"]([^'"]+)['"]"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <a class="dl" href="/files/one.mkv">one</a>
          <a class="dl" href="javascript:void(0)">noop</a>
          <a class="dl" href="https://mirror.example.net/two.mkv">two</a>
          <script>
            function show_content_v() { var a = "https://hidden.example.org/x"; }
            window.open("https://popup.example.org/y");
            location.href = '/relative/z';
          </script>
        </body></html>
    "#;

    #[test]
    fn selector_tier_reads_attributes() {
        let page = Page::new(PAGE, "https://site.example");
        let tier = SelectorTier::new("buttons", "a.dl", "href");
        assert_eq!(tier.extract(&page).len(), 3);
    }

    #[test]
    fn first_acceptable_respects_tier_order() {
        let page = Page::new(PAGE, "https://site.example");
        let chain = TierChain::new()
            .tier(PatternTier::new("scripts", SCRIPT_REDIRECT_PATTERNS, Capture::Group(1)))
            .tier(SelectorTier::new("buttons", "a.dl", "href"));
        assert_eq!(
            chain.first_acceptable(&page).as_deref(),
            Some("https://popup.example.org/y")
        );
    }

    #[test]
    fn collect_all_resolves_and_skips_pseudo_links() {
        let page = Page::new(PAGE, "https://site.example");
        let chain = TierChain::new()
            .tier(SelectorTier::new("buttons", "a.dl", "href"))
            .tier(ScriptBodyTier::new("show_content_v"))
            .tier(PatternTier::new("scripts", SCRIPT_REDIRECT_PATTERNS, Capture::Group(1)));
        assert_eq!(
            chain.collect_all(&page),
            vec![
                "https://site.example/files/one.mkv",
                "https://mirror.example.net/two.mkv",
                "https://hidden.example.org/x",
                "https://popup.example.org/y",
                "https://site.example/relative/z",
            ]
        );
    }

    #[test]
    fn absolute_only_tiers_drop_relative_candidates() {
        let page = Page::new(PAGE, "https://site.example");
        let chain = TierChain::new().tier(
            SelectorTier::new("buttons", "a.dl", "href").absolute_only(),
        );
        assert_eq!(
            chain.collect_all(&page),
            vec!["https://mirror.example.net/two.mkv"]
        );
    }

    #[test]
    fn fragment_links_are_only_dropped_by_strict_chains() {
        let page = Page::new(
            r#"<a class="dl" href="https://mega.nz/file/AbCd#keyXYZ">mega</a>"#,
            "https://site.example",
        );
        let lenient = TierChain::new().tier(SelectorTier::new("buttons", "a.dl", "href"));
        assert_eq!(
            lenient.collect_all(&page),
            vec!["https://mega.nz/file/AbCd#keyXYZ"]
        );

        let strict = TierChain::new()
            .tier(SelectorTier::new("buttons", "a.dl", "href"))
            .rejecting_pseudo_links();
        assert!(strict.first_acceptable(&page).is_none());
    }

    #[test]
    fn missing_script_function_yields_nothing() {
        let page = Page::new("<html></html>", "https://site.example");
        assert!(ScriptBodyTier::new("show_content_v").extract(&page).is_empty());
    }
}
