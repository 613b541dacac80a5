//! GDFlix (`gdflix.*`) file pages.
//!
//! The service rotates its domain, so the live origin is looked up in the
//! mirror manifest and the input URL is rewritten onto it before fetching.
//! Server buttons are bucketed by their visible label. "Index Links" opens a
//! two-level crawl and "Instant DL" hides its target in a redirect; both are
//! best-effort and never fail the whole attempt.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use super::mirror::MirrorResolver;
use super::{BypassStrategy, refer_from_origin};
use crate::bypass::classifier::ServiceFamily;
use crate::bypass::core::{
    BypassError, BypassSession, CandidateLink, RawOutcome, origin_from_url, resolve_link,
    swap_origin,
};

pub const DEFAULT_ORIGIN: &str = "https://gdflix.dev";
pub const MANIFEST_KEY: &str = "gdflix";

static LIST_ITEMS: Lazy<Selector> = Lazy::new(|| Selector::parse("li").expect("invalid li selector"));
static SERVER_BUTTONS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.text-center a").expect("invalid server selector"));
static INDEX_BUTTONS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.btn.btn-outline-info").expect("invalid index selector"));
static INDEX_SOURCES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.mb-4 > a").expect("invalid index source selector"));

/// How a server button is turned into links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerKind {
    Plain(&'static str),
    Index,
    InstantDl,
}

/// Label markers in the order they are checked.
const SERVER_LABELS: &[(&str, ServerKind)] = &[
    ("DIRECT DL", ServerKind::Plain("Direct")),
    ("CLOUD DOWNLOAD", ServerKind::Plain("Cloud R2")),
    ("PixelDrain", ServerKind::Plain("Pixeldrain")),
    ("Index Links", ServerKind::Index),
    ("Instant DL", ServerKind::InstantDl),
    ("GoFile", ServerKind::Plain("GoFile")),
    ("DRIVEBOT", ServerKind::Plain("DriveBot")),
];

const INDEX_LABEL: &str = "Index";
const INSTANT_LABEL: &str = "Instant DL";

fn classify_label(label: &str) -> Option<ServerKind> {
    SERVER_LABELS
        .iter()
        .find(|(marker, _)| label.contains(marker))
        .map(|(_, kind)| *kind)
}

#[derive(Debug, Default)]
struct FilePage {
    file_name: Option<String>,
    file_size: Option<String>,
    servers: Vec<(ServerKind, String)>,
}

/// Text after `marker` in the first list item that contains it.
fn list_value(document: &Html, marker: &str) -> Option<String> {
    document
        .select(&LIST_ITEMS)
        .map(|li| li.text().collect::<String>())
        .find_map(|text| {
            text.split_once(marker)
                .map(|(_, value)| value.trim().to_string())
        })
        .filter(|value| !value.is_empty())
}

fn parse_file_page(body: &str, origin: &str) -> FilePage {
    let document = Html::parse_document(body);

    let servers = document
        .select(&SERVER_BUTTONS)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let label = anchor.text().collect::<String>();
            let kind = classify_label(label.trim())?;
            let url = resolve_link(origin, href)?;
            Some((kind, url))
        })
        .collect();

    FilePage {
        file_name: list_value(&document, "Name : "),
        file_size: list_value(&document, "Size : "),
        servers,
    }
}

fn select_links(body: &str, selector: &Selector, origin: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    document
        .select(selector)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_link(origin, href))
        .collect()
}

/// Final link hidden in the `url=` part of a redirect target.
fn instant_target(location: &str) -> Option<String> {
    location
        .rsplit_once("url=")
        .map(|(_, target)| target.to_string())
        .filter(|target| !target.is_empty())
}

pub struct GdflixStrategy {
    resolver: MirrorResolver,
}

impl GdflixStrategy {
    pub fn new() -> Self {
        Self::with_resolver(MirrorResolver::new(MANIFEST_KEY, DEFAULT_ORIGIN))
    }

    pub fn with_resolver(resolver: MirrorResolver) -> Self {
        Self { resolver }
    }

    /// Two-level crawl: index page buttons, then the sources on each sub page.
    async fn crawl_index(
        &self,
        session: &BypassSession,
        index_url: &str,
        latest: &str,
    ) -> Result<Vec<String>, BypassError> {
        let index_url = Url::parse(index_url)?;
        let index_body = session.get(&index_url).await?.ensure_success()?.text();
        let sub_pages = select_links(&index_body, &INDEX_BUTTONS, latest);

        let mut found = Vec::new();
        for sub_page in sub_pages {
            let sub_url = Url::parse(&sub_page)?;
            let body = session.get(&sub_url).await?.ensure_success()?.text();
            found.extend(select_links(&body, &INDEX_SOURCES, &origin_from_url(&sub_url)));
        }
        Ok(found)
    }

    async fn instant_link(
        &self,
        session: &BypassSession,
        url: &str,
    ) -> Result<Option<String>, BypassError> {
        let url = Url::parse(url)?;
        let response = session.get_without_redirect(&url).await?;
        let target = response.location().and_then(instant_target);
        if target.is_none() {
            log::debug!("instant link {url} redirected without a url= target, dropping it");
        }
        Ok(target)
    }
}

impl Default for GdflixStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BypassStrategy for GdflixStrategy {
    fn family(&self) -> ServiceFamily {
        ServiceFamily::GDFlix
    }

    async fn bypass(
        &self,
        session: &mut BypassSession,
        url: &Url,
    ) -> Result<RawOutcome, BypassError> {
        refer_from_origin(session, url)?;
        let latest = self.resolver.current_origin(session).await;
        let target = Url::parse(&swap_origin(url.as_str(), &latest))?;
        log::debug!("gdflix target rewritten to {target}");

        let body = session.get(&target).await?.ensure_success()?.text();
        let FilePage {
            file_name,
            file_size,
            servers,
        } = parse_file_page(&body, &latest);

        let link = |kind: &str, url: String| {
            CandidateLink::new(kind, url).with_file(file_name.clone(), file_size.clone())
        };

        let mut links = Vec::new();
        for (kind, href) in servers {
            match kind {
                ServerKind::Plain(label) => links.push(link(label, href)),
                ServerKind::Index => match self.crawl_index(session, &href, &latest).await {
                    Ok(found) => links.extend(found.into_iter().map(|url| link(INDEX_LABEL, url))),
                    Err(err) => log::warn!("index crawl of {href} failed: {err}"),
                },
                ServerKind::InstantDl => match self.instant_link(session, &href).await {
                    Ok(Some(url)) => links.push(link(INSTANT_LABEL, url)),
                    Ok(None) => {}
                    Err(err) => log::warn!("instant link {href} failed: {err}"),
                },
            }
        }

        Ok(RawOutcome::Catalogue {
            file_name,
            file_size,
            links,
        })
    }
}
