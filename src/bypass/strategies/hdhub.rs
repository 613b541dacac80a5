//! HDHub (`hdhub*`) release posts.
//!
//! Posts list their mirrors as headline anchors with no form step in front of
//! them. Headline links and any anchor pointing at a known mirror host are
//! collected first; the FastiLinks list tiers pick up the rest.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use url::Url;

use super::fastilinks::list_tiers;
use super::{BypassStrategy, refer_from_origin};
use crate::bypass::classifier::ServiceFamily;
use crate::bypass::core::{
    BypassError, BypassSession, Page, RawOutcome, SelectorTier, TierChain,
};

/// Hosts HDHub posts typically mirror to.
const MIRROR_ANCHORS: &str = "a[href*='hubdrive'], a[href*='hubcloud'], a[href*='hubcdn'], \
     a[href*='gdflix'], a[href*='pixeldrain'], a[href*='gofile']";

static TIERS: Lazy<TierChain> = Lazy::new(|| {
    let structural = TierChain::new()
        .tier(SelectorTier::new("hdhub:headlines", "h3 > a, h4 > a", "href").absolute_only())
        .tier(SelectorTier::new("hdhub:mirrors", MIRROR_ANCHORS, "href").absolute_only());
    structural.extend(list_tiers())
});

#[derive(Debug, Default)]
pub struct HdHubStrategy;

impl HdHubStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BypassStrategy for HdHubStrategy {
    fn family(&self) -> ServiceFamily {
        ServiceFamily::HDHub
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
