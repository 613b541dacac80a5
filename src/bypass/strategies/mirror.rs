//! Live-domain lookup for services that rotate their backend host.
//!
//! A small JSON manifest maps service keys to their current origin
//! (`{"gdflix": "https://new.gdflix.example", ...}`). Any failure falls back to
//! a fixed domain so the strategy can still try.

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::bypass::core::BypassSession;

pub const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/SaurabhKaperwan/Utils/refs/heads/main/urls.json";
pub const DEFAULT_MANIFEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct MirrorResolver {
    manifest_url: String,
    key: String,
    fallback: String,
    timeout: Duration,
}

impl MirrorResolver {
    pub fn new(key: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            key: key.into(),
            fallback: fallback.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_MANIFEST_TIMEOUT,
        }
    }

    pub fn with_manifest_url(mut self, manifest_url: impl Into<String>) -> Self {
        self.manifest_url = manifest_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Current origin for the service, without a trailing slash.
    pub async fn current_origin(&self, session: &BypassSession) -> String {
        match self.lookup(session).await {
            Some(origin) => origin,
            None => {
                log::debug!(
                    "manifest lookup for '{}' failed, using {}",
                    self.key,
                    self.fallback
                );
                self.fallback.clone()
            }
        }
    }

    async fn lookup(&self, session: &BypassSession) -> Option<String> {
        let manifest = Url::parse(&self.manifest_url).ok()?;
        let response = match session.get_with_timeout(&manifest, self.timeout).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!("mirror manifest {} unreachable: {err}", self.manifest_url);
                return None;
            }
        };
        let data: Value = response.json().ok()?;
        data.get(&self.key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|origin| origin.starts_with("http"))
            .map(|origin| origin.trim_end_matches('/').to_string())
    }
}
