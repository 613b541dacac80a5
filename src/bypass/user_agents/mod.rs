//! User-Agent selection.
//!
//! Responsibilities:
//! - Keep a small built-in pool of desktop and mobile browser strings.
//! - Provide filtered random selections based on device flags.
//! - Allow a custom override that bypasses the pool entirely.

use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Desktop string most link gates were scraped with.
pub const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Mobile string HubDrive serves its lighter page to.
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36";

const DESKTOP_POOL: &[&str] = &[
    DESKTOP_USER_AGENT,
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

const MOBILE_POOL: &[&str] = &[
    MOBILE_USER_AGENT,
    "Mozilla/5.0 (Linux; Android 13; SM-S901B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

/// Options to filter/select a user agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAgentOptions {
    pub custom: Option<String>,
    pub desktop: bool,
    pub mobile: bool,
    /// Pick randomly from the pool instead of the first entry.
    pub rotate: bool,
}

impl Default for UserAgentOptions {
    fn default() -> Self {
        Self {
            custom: None,
            desktop: true,
            mobile: false,
            rotate: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserAgentError {
    #[error("invalid user-agent options: {0}")]
    InvalidOptions(String),
}

/// Resolve the options into one concrete User-Agent string.
pub fn select_user_agent(opts: &UserAgentOptions) -> Result<String, UserAgentError> {
    if let Some(custom) = opts.custom.as_deref() {
        let custom = custom.trim();
        if custom.is_empty() {
            return Err(UserAgentError::InvalidOptions(
                "custom user-agent is empty".into(),
            ));
        }
        return Ok(custom.to_string());
    }

    if !opts.desktop && !opts.mobile {
        return Err(UserAgentError::InvalidOptions(
            "Desktop and mobile cannot both be disabled".into(),
        ));
    }

    let mut pool: Vec<&str> = Vec::new();
    if opts.desktop {
        pool.extend_from_slice(DESKTOP_POOL);
    }
    if opts.mobile {
        pool.extend_from_slice(MOBILE_POOL);
    }

    let chosen = if opts.rotate {
        pool.choose(&mut thread_rng()).copied()
    } else {
        pool.first().copied()
    };

    chosen
        .map(str::to_string)
        .ok_or_else(|| UserAgentError::InvalidOptions("empty user-agent pool".into()))
}
