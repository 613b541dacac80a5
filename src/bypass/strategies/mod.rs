//! Per-service bypass strategies.
//!
//! Each submodule unlocks one family of link gates. All of them sit behind the
//! [`BypassStrategy`] trait and are selected by [`ServiceFamily`] tag.

pub mod fastilinks;
pub mod gdflix;
pub mod gyani;
pub mod hdhub;
pub mod hubcloud;
pub mod hubdrive;
pub mod mirror;
pub mod photolinx;

use async_trait::async_trait;
use url::Url;

use crate::bypass::classifier::ServiceFamily;
use crate::bypass::core::{
    BypassError, BypassSession, Page, RawOutcome, TierChain, origin_from_url,
};

pub use fastilinks::FastiLinksStrategy;
pub use gdflix::GdflixStrategy;
pub use gyani::GyaniStrategy;
pub use hdhub::HdHubStrategy;
pub use hubcloud::{HubCdnStrategy, HubCloudStrategy};
pub use hubdrive::HubDriveStrategy;
pub use mirror::MirrorResolver;
pub use photolinx::PhotoLinxStrategy;

/// Unlock protocol for one service family.
#[async_trait]
pub trait BypassStrategy: Send + Sync {
    fn family(&self) -> ServiceFamily;

    /// Run the request choreography for `url` inside `session`.
    async fn bypass(
        &self,
        session: &mut BypassSession,
        url: &Url,
    ) -> Result<RawOutcome, BypassError>;
}

/// Point the session's Referer at the input origin and return that origin.
pub(crate) fn refer_from_origin(
    session: &mut BypassSession,
    url: &Url,
) -> Result<String, BypassError> {
    let origin = origin_from_url(url);
    session.set_referer(&format!("{origin}/"))?;
    Ok(origin)
}

/// Fetch `url` and return the first acceptable link of `tiers`.
///
/// Shared by the single-link hosts (HubDrive, HubCloud, HubCDN).
pub(crate) async fn unlock_single(
    session: &mut BypassSession,
    url: &Url,
    tiers: &TierChain,
) -> Result<RawOutcome, BypassError> {
    let origin = refer_from_origin(session, url)?;
    let response = session.get(url).await?.ensure_success()?;
    let body = response.text();

    let link = {
        let page = Page::new(&body, origin);
        tiers.first_acceptable(&page)
    };

    if link.is_none() {
        log::debug!("no tier matched on {url}");
    }
    Ok(RawOutcome::Single(link))
}
