//! Gyani (`gyanigurus.*`) article pages.
//!
//! Links hide in three places: outbound anchors, the body of the
//! `show_content_v()` reveal function, and plain redirect assignments. All of
//! them are merged; anchors pointing back at the site itself are dropped.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::Selector;
use url::Url;

use super::{BypassStrategy, refer_from_origin};
use crate::bypass::classifier::ServiceFamily;
use crate::bypass::core::{
    BypassError, BypassSession, Capture, ExtractionTier, Page, PatternTier, RawOutcome,
    ScriptBodyTier, TierChain,
};

/// Host keywords that mark a link as pointing back at Gyani.
const SELF_KEYWORDS: &[&str] = &["gyanigurus", "gyani"];

const DOWNLOAD_PATTERNS: &[&str] = &[
    r#"window\.location\s*=\s*["']([^"']+)["']"#,
    r#"window\.open\s*\(\s*["']([^"']+)["']"#,
    r#"location\.href\s*=\s*["']([^"']+)["']"#,
    r#"downloadUrl\s*=\s*["']([^"']+)["']"#,
    r#"fileUrl\s*=\s*["']([^"']+)["']"#,
];

/// Absolute anchors that do not lead back to the site.
struct OutboundAnchors {
    selector: Selector,
}

impl OutboundAnchors {
    fn new() -> Self {
        Self {
            selector: Selector::parse("a[href]").expect("invalid anchor selector"),
        }
    }
}

impl ExtractionTier for OutboundAnchors {
    fn name(&self) -> &str {
        "gyani:anchors"
    }

    fn extract(&self, page: &Page<'_>) -> Vec<String> {
        page.document()
            .select(&self.selector)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter(|href| href.starts_with("http"))
            .filter(|href| !SELF_KEYWORDS.iter().any(|keyword| href.contains(keyword)))
            .map(str::to_string)
            .collect()
    }
}

static TIERS: Lazy<TierChain> = Lazy::new(|| {
    TierChain::new()
        .tier(OutboundAnchors::new())
        .tier(ScriptBodyTier::new("show_content_v"))
        .tier(PatternTier::case_sensitive(
            "gyani:script",
            DOWNLOAD_PATTERNS,
            Capture::Group(1),
        ))
});

#[derive(Debug, Default)]
pub struct GyaniStrategy;

impl GyaniStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BypassStrategy for GyaniStrategy {
    fn family(&self) -> ServiceFamily {
        ServiceFamily::Gyani
    }

    async fn bypass(
        &self,
        session: &mut BypassSession,
        url: &Url,
    ) -> Result<RawOutcome, BypassError> {
        let origin = refer_from_origin(session, url)?;
        let response = session.get(url).await?.ensure_success()?;
        let body = response.text();

        let links = {
            let page = Page::new(&body, origin);
            TIERS.collect_all(&page)
        };
        Ok(RawOutcome::Links(links))
    }
}
