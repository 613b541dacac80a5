//! Settings and configuration module
//!
//! Provides unified configuration with:
//! - JSON loading (string or file)
//! - Defaults for every field
//! - Validation before the unlocker is built

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bypass::classifier::ServiceFamily;
use crate::bypass::strategies::mirror::DEFAULT_MANIFEST_URL;
use crate::bypass::strategies::{fastilinks, gdflix, photolinx};
use crate::bypass::user_agents::UserAgentOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Extra host pattern routed to a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAlias {
    pub family: ServiceFamily,
    pub pattern: String,
}

/// Origins used when a link or the mirror manifest gives none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackDomains {
    pub photolinx: String,
    pub fastilinks: String,
    pub gdflix: String,
}

impl Default for FallbackDomains {
    fn default() -> Self {
        Self {
            photolinx: photolinx::DEFAULT_ORIGIN.to_string(),
            fastilinks: fastilinks::DEFAULT_ORIGIN.to_string(),
            gdflix: gdflix::DEFAULT_ORIGIN.to_string(),
        }
    }
}

impl FallbackDomains {
    fn entries(&self) -> [(&'static str, &str); 3] {
        [
            ("photolinx", self.photolinx.as_str()),
            ("fastilinks", self.fastilinks.as_str()),
            ("gdflix", self.gdflix.as_str()),
        ]
    }
}

/// Unlocker settings. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnlockerConfig {
    /// Per HTTP request, in seconds.
    pub request_timeout_secs: u64,
    /// Whole bypass attempt, in seconds.
    pub dispatch_timeout_secs: u64,
    /// Mirror manifest lookup, in seconds.
    pub manifest_timeout_secs: u64,
    pub manifest_url: String,
    /// Manifest key per family whose live domain rotates.
    pub manifest_keys: BTreeMap<ServiceFamily, String>,
    pub fallback_domains: FallbackDomains,
    pub user_agent: UserAgentOptions,
    pub aliases: Vec<DomainAlias>,
    pub enable_metrics: bool,
    pub enable_logging: bool,
}

impl Default for UnlockerConfig {
    fn default() -> Self {
        let mut manifest_keys = BTreeMap::new();
        manifest_keys.insert(ServiceFamily::GDFlix, gdflix::MANIFEST_KEY.to_string());
        Self {
            request_timeout_secs: 15,
            dispatch_timeout_secs: 60,
            manifest_timeout_secs: 10,
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            manifest_keys,
            fallback_domains: FallbackDomains::default(),
            user_agent: UserAgentOptions::default(),
            aliases: Vec::new(),
            enable_metrics: true,
            enable_logging: true,
        }
    }
}

impl UnlockerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secs) in [
            ("request_timeout_secs", self.request_timeout_secs),
            ("dispatch_timeout_secs", self.dispatch_timeout_secs),
            ("manifest_timeout_secs", self.manifest_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }

        url::Url::parse(&self.manifest_url)
            .map_err(|err| ConfigError::Invalid(format!("manifest_url: {err}")))?;

        for (family, origin) in self.fallback_domains.entries() {
            if !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "fallback domain for {family} must be an http(s) origin, got '{origin}'"
                )));
            }
        }

        for alias in &self.aliases {
            regex::Regex::new(&alias.pattern).map_err(|err| {
                ConfigError::Invalid(format!("alias for {}: {err}", alias.family))
            })?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn manifest_timeout(&self) -> Duration {
        Duration::from_secs(self.manifest_timeout_secs)
    }

    pub fn manifest_key(&self, family: ServiceFamily) -> Option<&str> {
        self.manifest_keys.get(&family).map(String::as_str)
    }
}
