//! Domain classification.
//!
//! Maps an arbitrary input URL to the service family that knows how to unlock
//! it. Patterns key on family-indicative host labels rather than exact
//! hostnames so the table keeps working when a site hops to a new TLD or
//! second-level domain.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Known link-gate services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceFamily {
    PhotoLinx,
    HubDrive,
    HubCloud,
    HubCDN,
    Gyani,
    GDFlix,
    HDHub,
    FastiLinks,
}

impl ServiceFamily {
    pub const ALL: [ServiceFamily; 8] = [
        ServiceFamily::PhotoLinx,
        ServiceFamily::HubDrive,
        ServiceFamily::HubCloud,
        ServiceFamily::HubCDN,
        ServiceFamily::Gyani,
        ServiceFamily::GDFlix,
        ServiceFamily::HDHub,
        ServiceFamily::FastiLinks,
    ];

    pub fn all() -> &'static [ServiceFamily] {
        &Self::ALL
    }

    /// Lowercase identifier, also used by serde and config files.
    pub fn name(self) -> &'static str {
        match self {
            ServiceFamily::PhotoLinx => "photolinx",
            ServiceFamily::HubDrive => "hubdrive",
            ServiceFamily::HubCloud => "hubcloud",
            ServiceFamily::HubCDN => "hubcdn",
            ServiceFamily::Gyani => "gyani",
            ServiceFamily::GDFlix => "gdflix",
            ServiceFamily::HDHub => "hdhub",
            ServiceFamily::FastiLinks => "fastilinks",
        }
    }

    /// Families whose strategy yields one best URL instead of a list.
    pub fn is_single_link(self) -> bool {
        matches!(
            self,
            ServiceFamily::PhotoLinx
                | ServiceFamily::HubDrive
                | ServiceFamily::HubCloud
                | ServiceFamily::HubCDN
        )
    }

    /// Label attached to links that carry no more specific type.
    pub fn default_label(self) -> &'static str {
        match self {
            ServiceFamily::PhotoLinx => "PhotoLinx",
            ServiceFamily::HubDrive => "HubDrive",
            ServiceFamily::HubCloud => "HubCloud",
            ServiceFamily::HubCDN => "HubCDN",
            ServiceFamily::Gyani => "Gyani",
            ServiceFamily::GDFlix => "GDFlix",
            ServiceFamily::HDHub => "HDHub",
            ServiceFamily::FastiLinks => "FastiLinks",
        }
    }
}

impl fmt::Display for ServiceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_label())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown service family '{0}'")]
pub struct UnknownFamily(pub String);

impl FromStr for ServiceFamily {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ServiceFamily::ALL
            .iter()
            .copied()
            .find(|family| family.name() == wanted)
            .ok_or_else(|| UnknownFamily(s.to_string()))
    }
}

/// Ordered regex set tied to one family.
#[derive(Debug, Clone)]
pub struct DomainPattern {
    family: ServiceFamily,
    patterns: Vec<Regex>,
}

impl DomainPattern {
    fn new(family: ServiceFamily, raw_patterns: &[&str]) -> Self {
        let patterns = raw_patterns
            .iter()
            .map(|pattern| build_regex(pattern))
            .collect();
        Self { family, patterns }
    }

    pub fn family(&self) -> ServiceFamily {
        self.family
    }

    fn find(&self, url: &str) -> Option<&Regex> {
        self.patterns.iter().find(|regex| regex.is_match(url))
    }
}

/// Built-in registry; order is the classification tie-break.
static KNOWN_PATTERNS: Lazy<Vec<DomainPattern>> = Lazy::new(|| {
    vec![
        DomainPattern::new(
            ServiceFamily::PhotoLinx,
            &[r"://(?:[^/?#]*\.)?photolinx[a-z0-9-]*\."],
        ),
        DomainPattern::new(
            ServiceFamily::HubDrive,
            &[
                r"://(?:[^/?#]*\.)?hubdrive[a-z0-9-]*\.",
                r"://(?:[^/?#]*\.)?hdrive[a-z0-9-]*\.",
            ],
        ),
        DomainPattern::new(
            ServiceFamily::HubCDN,
            &[r"://(?:[^/?#]*\.)?hubcdn[a-z0-9-]*\."],
        ),
        DomainPattern::new(
            ServiceFamily::HubCloud,
            &[r"://(?:[^/?#]*\.)?hubcloud[a-z0-9-]*\."],
        ),
        DomainPattern::new(
            ServiceFamily::Gyani,
            &[r"://(?:[^/?#]*\.)?gyani[a-z0-9-]*\."],
        ),
        DomainPattern::new(
            ServiceFamily::GDFlix,
            &[r"://(?:[^/?#]*\.)?gdflix[a-z0-9-]*\."],
        ),
        DomainPattern::new(
            ServiceFamily::HDHub,
            &[r"://(?:[^/?#]*\.)?hdhub[a-z0-9-]*\."],
        ),
        DomainPattern::new(
            ServiceFamily::FastiLinks,
            &[r"://(?:[^/?#]*\.)?fast(?:i)?links[a-z0-9-]*\."],
        ),
    ]
});

/// Classification output with the pattern that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub family: ServiceFamily,
    pub pattern: String,
    pub is_alias: bool,
}

/// Stateless URL → family lookup.
///
/// Aliases are registered while building and consulted after the built-in
/// table; the classifier is read-only once shared.
#[derive(Debug, Clone)]
pub struct DomainClassifier {
    known_patterns: Vec<DomainPattern>,
    aliases: Vec<DomainPattern>,
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainClassifier {
    pub fn new() -> Self {
        Self {
            known_patterns: KNOWN_PATTERNS.clone(),
            aliases: Vec::new(),
        }
    }

    /// Register an extra pattern for `family`.
    pub fn with_alias(mut self, family: ServiceFamily, pattern: &str) -> Result<Self, regex::Error> {
        let regex = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()?;
        self.aliases.push(DomainPattern {
            family,
            patterns: vec![regex],
        });
        Ok(self)
    }

    pub fn classify(&self, url: &str) -> Option<ServiceFamily> {
        self.classify_detailed(url).map(|hit| hit.family)
    }

    pub fn classify_detailed(&self, url: &str) -> Option<Classification> {
        let url = url.trim();
        let lookup = |table: &[DomainPattern], is_alias: bool| {
            table.iter().find_map(|entry| {
                entry.find(url).map(|regex| Classification {
                    family: entry.family,
                    pattern: regex.as_str().to_string(),
                    is_alias,
                })
            })
        };

        lookup(&self.known_patterns, false).or_else(|| lookup(&self.aliases, true))
    }

    pub fn is_supported(&self, url: &str) -> bool {
        self.classify_detailed(url).is_some()
    }
}

fn build_regex(pattern: &str) -> Regex {
    regex::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|err| panic!("invalid domain pattern regex `{}`: {}", pattern, err))
}
