//! HubDrive (`hubdrive.*`, `hdrive.*`) file pages.
//!
//! No form step: the landing page already embeds the next hop. Site-specific
//! URL shapes are tried first, then JS variable assignments; the first
//! acceptable match wins.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use url::Url;

use super::{BypassStrategy, unlock_single};
use crate::bypass::classifier::ServiceFamily;
use crate::bypass::core::{
    BypassError, BypassSession, Capture, PatternTier, RawOutcome, SCRIPT_VARIABLE_PATTERNS,
    TierChain,
};
use crate::bypass::user_agents::MOBILE_USER_AGENT;

/// Known next-hop hosts, most specific first.
pub(crate) const HOST_PATTERNS: &[&str] = &[
    r"https://hubcloud\.\w+/drive/[a-zA-Z0-9]+",
    r#"https://[^/\s]+\.hubcloud\.[^/\s]+/[^\s"'<>]+"#,
    r#"https://cdn\.fsl-buckets\.xyz/[^\s"'<>]+"#,
    r#"https://pixeldrain\.\w+/api/file/[^\s"'<>]+"#,
    r#"https://pixel\.hubcdn\.\w+/\?id=[^\s"'<>]+"#,
    r#"https://[^/\s]+\.\w+/[^\s"'<>]+\.(?:mkv|mp4|avi|mov)"#,
];

static TIERS: Lazy<TierChain> = Lazy::new(|| {
    TierChain::new()
        .tier(PatternTier::new("hubdrive:hosts", HOST_PATTERNS, Capture::Whole))
        .tier(
            PatternTier::new("hubdrive:script", SCRIPT_VARIABLE_PATTERNS, Capture::Group(1))
                .absolute_only(),
        )
        .rejecting_pseudo_links()
});

pub struct HubDriveStrategy {
    user_agent: String,
}

impl HubDriveStrategy {
    pub fn new() -> Self {
        Self {
            user_agent: MOBILE_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for HubDriveStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BypassStrategy for HubDriveStrategy {
    fn family(&self) -> ServiceFamily {
        ServiceFamily::HubDrive
    }

    async fn bypass(
        &self,
        session: &mut BypassSession,
        url: &Url,
    ) -> Result<RawOutcome, BypassError> {
        session.set_user_agent(&self.user_agent)?;
        unlock_single(session, url, &TIERS).await
    }
}
