//! FastiLinks (`fastilinks.*`) protected link lists.
//!
//! Flow:
//! 1. GET the page to obtain `PHPSESSID`.
//! 2. Locate the `_csrf_token_*` form field (or just its name).
//! 3. POST the form back with the session cookie.
//! 4. Collect links from the revealed list, download buttons and redirect scripts.

use async_trait::async_trait;
use http::header::{COOKIE, HeaderMap, HeaderValue};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::BypassStrategy;
use crate::bypass::classifier::ServiceFamily;
use crate::bypass::core::{
    BypassError, BypassSession, Capture, Page, PatternTier, RawOutcome, SCRIPT_REDIRECT_PATTERNS,
    SelectorTier, TierChain, TransportError, origin_of,
};

pub const DEFAULT_ORIGIN: &str = "https://fastilinks.online";

/// Sent when the page names a CSRF field but carries no usable value.
pub const PLACEHOLDER_TOKEN: &str = "default_token_placeholder";

const SESSION_COOKIE: &str = "PHPSESSID";

static CSRF_INPUT: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"input[name*="_csrf_token_"]"#).expect("invalid csrf selector")
});

static CSRF_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_csrf_token_[a-f0-9]+").expect("invalid csrf name regex"));

/// Structural + script tiers shared with HDHub list pages.
pub(crate) fn list_tiers() -> TierChain {
    TierChain::new()
        .tier(SelectorTier::new("list:well", "div.well > a", "href").absolute_only())
        .tier(
            SelectorTier::new(
                "list:buttons",
                ".btn-download, .download-btn, .btn-success, a[href*='download']",
                "href",
            )
            .absolute_only(),
        )
        .tier(PatternTier::case_sensitive(
            "list:redirects",
            SCRIPT_REDIRECT_PATTERNS,
            Capture::Group(1),
        ))
}

static TIERS: Lazy<TierChain> = Lazy::new(list_tiers);

/// Form field to echo back; `None` when the page has no CSRF marker at all.
fn find_csrf_field(body: &str) -> Option<(String, String)> {
    let document = Html::parse_document(body);
    if let Some(input) = document.select(&CSRF_INPUT).next()
        && let Some(name) = input.value().attr("name")
    {
        let value = input
            .value()
            .attr("value")
            .filter(|value| !value.is_empty())
            .unwrap_or(PLACEHOLDER_TOKEN);
        return Some((name.to_string(), value.to_string()));
    }

    CSRF_NAME_RE
        .find(body)
        .map(|m| (m.as_str().to_string(), PLACEHOLDER_TOKEN.to_string()))
}

pub struct FastiLinksStrategy {
    fallback_origin: String,
}

impl FastiLinksStrategy {
    pub fn new() -> Self {
        Self::with_fallback_origin(DEFAULT_ORIGIN)
    }

    pub fn with_fallback_origin(origin: impl Into<String>) -> Self {
        Self {
            fallback_origin: origin.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for FastiLinksStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BypassStrategy for FastiLinksStrategy {
    fn family(&self) -> ServiceFamily {
        ServiceFamily::FastiLinks
    }

    async fn bypass(
        &self,
        session: &mut BypassSession,
        url: &Url,
    ) -> Result<RawOutcome, BypassError> {
        let base = origin_of(url.as_str())
            .unwrap_or(&self.fallback_origin)
            .to_string();

        let landing = session.get(url).await?.ensure_success()?;
        let ssid = session
            .cookie(url, SESSION_COOKIE)
            .ok_or_else(|| BypassError::session("no PHPSESSID cookie found"))?;

        let landing_body = landing.text();
        let form = match find_csrf_field(&landing_body) {
            Some(field) => vec![field],
            None => {
                log::debug!("no csrf field on {url}, posting an empty form");
                Vec::new()
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{SESSION_COOKIE}={ssid}"))
                .map_err(|_| TransportError::InvalidRequest("invalid session cookie".into()))?,
        );

        let revealed = session
            .post_form(url, form, headers)
            .await?
            .ensure_success()?;
        let body = revealed.text();

        let links = {
            let page = Page::new(&body, base);
            TIERS.collect_all(&page)
        };
        Ok(RawOutcome::Links(links))
    }
}
