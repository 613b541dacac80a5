//! HubCloud and HubCDN single-link pages.
//!
//! Same policy as HubDrive: an ordered list of extraction tiers where the
//! first acceptable match wins.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use url::Url;

use super::{BypassStrategy, unlock_single};
use crate::bypass::classifier::ServiceFamily;
use crate::bypass::core::{
    BypassError, BypassSession, Capture, PatternTier, RawOutcome, SCRIPT_REDIRECT_PATTERNS,
    SCRIPT_VARIABLE_PATTERNS, SelectorTier, TierChain,
};

static HUBCLOUD_TIERS: Lazy<TierChain> = Lazy::new(|| {
    TierChain::new()
        .tier(SelectorTier::new("hubcloud:button", "a#download", "href"))
        .tier(PatternTier::new(
            "hubcloud:hosts",
            &[
                r#"https://[^/\s"'<>]+/hubcloud\.php\?[^\s"'<>]+"#,
                r#"https://cdn\.fsl-buckets\.xyz/[^\s"'<>]+"#,
                r#"https://pixeldrain\.\w+/api/file/[^\s"'<>]+"#,
                r#"https://[^/\s]+\.\w+/[^\s"'<>]+\.(?:mkv|mp4|avi|mov)"#,
            ],
            Capture::Whole,
        ))
        .tier(
            PatternTier::new("hubcloud:script", SCRIPT_VARIABLE_PATTERNS, Capture::Group(1))
                .absolute_only(),
        )
        .rejecting_pseudo_links()
});

static HUBCDN_TIERS: Lazy<TierChain> = Lazy::new(|| {
    TierChain::new()
        .tier(PatternTier::new(
            "hubcdn:reurl",
            &[r#"var\s+reurl\s*=\s*["']([^"']+)["']"#],
            Capture::Group(1),
        ))
        .tier(PatternTier::new(
            "hubcdn:hosts",
            &[
                r#"https://pixel\.hubcdn\.\w+/\?id=[^\s"'<>]+"#,
                r#"https://cdn\.fsl-buckets\.xyz/[^\s"'<>]+"#,
                r#"https://[^/\s]+\.\w+/[^\s"'<>]+\.(?:mkv|mp4|avi|mov)"#,
            ],
            Capture::Whole,
        ))
        .tier(
            PatternTier::new("hubcdn:redirect", SCRIPT_REDIRECT_PATTERNS, Capture::Group(1))
                .absolute_only(),
        )
        .rejecting_pseudo_links()
});

#[derive(Debug, Default)]
pub struct HubCloudStrategy;

impl HubCloudStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BypassStrategy for HubCloudStrategy {
    fn family(&self) -> ServiceFamily {
        ServiceFamily::HubCloud
    }

    async fn bypass(
        &self,
        session: &mut BypassSession,
        url: &Url,
    ) -> Result<RawOutcome, BypassError> {
        unlock_single(session, url, &HUBCLOUD_TIERS).await
    }
}

#[derive(Debug, Default)]
pub struct HubCdnStrategy;

impl HubCdnStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BypassStrategy for HubCdnStrategy {
    fn family(&self) -> ServiceFamily {
        ServiceFamily::HubCDN
    }

    async fn bypass(
        &self,
        session: &mut BypassSession,
        url: &Url,
    ) -> Result<RawOutcome, BypassError> {
        unlock_single(session, url, &HUBCDN_TIERS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::bypass::core::fixtures::FixtureClient;

    async fn run(
        strategy: &dyn BypassStrategy,
        url: &str,
        body: &str,
    ) -> Result<RawOutcome, BypassError> {
        let client = Arc::new(FixtureClient::new().with_page(url, 200, body));
        let mut session = BypassSession::new(client);
        strategy.bypass(&mut session, &Url::parse(url).unwrap()).await
    }

    #[tokio::test]
    async fn hubcloud_prefers_download_button_and_resolves_it() {
        let body = r#"
            <a id="download" href="/hubcloud.php?host=hubcloud&id=abc&token=t1">Generate</a>
            <script>var url = 'https://elsewhere.example/x';</script>
        "#;
        let outcome = run(&HubCloudStrategy::new(), "https://hubcloud.one/drive/abc", body)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            RawOutcome::Single(Some(
                "https://hubcloud.one/hubcloud.php?host=hubcloud&id=abc&token=t1".into()
            ))
        );
    }

    #[tokio::test]
    async fn hubcloud_scans_hosts_without_button() {
        let body = r#"<p>mirror: https://gamerxyt.com/hubcloud.php?host=hubcloud&id=xyz</p>"#;
        let outcome = run(&HubCloudStrategy::new(), "https://hubcloud.ink/drive/xyz", body)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            RawOutcome::Single(Some(
                "https://gamerxyt.com/hubcloud.php?host=hubcloud&id=xyz".into()
            ))
        );
    }

    #[tokio::test]
    async fn hubcdn_reads_reurl_assignment() {
        let body = r#"<script>var reurl = "https://pixel.hubcdn.fans/?id=Zm9vYmFy";</script>"#;
        let outcome = run(&HubCdnStrategy::new(), "https://hubcdn.fans/file/1", body)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            RawOutcome::Single(Some("https://pixel.hubcdn.fans/?id=Zm9vYmFy".into()))
        );
    }

    #[tokio::test]
    async fn hubcdn_without_links_is_none() {
        let outcome = run(&HubCdnStrategy::new(), "https://hubcdn.fans/file/2", "<html></html>")
            .await
            .unwrap();
        assert_eq!(outcome, RawOutcome::Single(None));
    }
}
