//! # linkunlock-rs
//!
//! A domain-resilient unlocker for ad-gated file-sharing pages.
//!
//! Hand it a link from one of the supported link gates and it walks the
//! site's cookie/token/redirect choreography until it reaches the real
//! download locations.
//!
//! ## Features
//!
//! - Family detection that survives domain and TLD rotation
//! - Per-service strategies for PhotoLinx, HubDrive, HubCloud, HubCDN, Gyani,
//!   GDFlix, HDHub and FastiLinks
//! - Layered extraction: CSS selectors, inline script patterns, raw URL scans
//! - Live mirror lookup for services that rotate their backend domain
//! - One isolated cookie jar per attempt, bounded by request and dispatch timeouts
//! - Event hooks with logging and in-memory metrics
//!
//! ## Example
//!
//! ```no_run
//! use linkunlock_rs::{BypassResult, DispatchOutcome, LinkUnlocker};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let unlocker = LinkUnlocker::new()?;
//!     match unlocker.handle("https://hubdrive.space/file/123").await {
//!         DispatchOutcome::Resolved(BypassResult::Found(bundle)) => {
//!             println!("{}", bundle.to_json());
//!         }
//!         DispatchOutcome::Resolved(BypassResult::NotFound) => println!("no links"),
//!         DispatchOutcome::Unsupported(url) => println!("unsupported: {url}"),
//!         DispatchOutcome::Failure(failure) => println!("failed: {failure}"),
//!     }
//!     Ok(())
//! }
//! ```

mod unlocker;

pub mod bypass;
pub mod config;
pub mod modules;

pub use crate::unlocker::{LinkUnlocker, LinkUnlockerBuilder, UnlockerError, UnlockerResult};

pub use crate::bypass::classifier::{
    Classification, DomainClassifier, ServiceFamily, UnknownFamily,
};

pub use crate::bypass::core::{
    BypassError, BypassSession, CandidateLink, RawOutcome, ReqwestSessionClient,
    ReqwestSessionFactory, RequestBody, SessionClientFactory, SessionHttpClient, SessionRequest,
    SessionResponse, TransportError,
};

pub use crate::bypass::dispatch::{
    BypassFailure, DispatchOutcome, Dispatcher, FailureKind, StrategyRegistry,
};

pub use crate::bypass::normalizer::{BypassResult, LinkBundle, normalize};

pub use crate::bypass::strategies::{
    BypassStrategy, FastiLinksStrategy, GdflixStrategy, GyaniStrategy, HdHubStrategy,
    HubCdnStrategy, HubCloudStrategy, HubDriveStrategy, MirrorResolver, PhotoLinxStrategy,
};

pub use crate::bypass::user_agents::{UserAgentError, UserAgentOptions, select_user_agent};

pub use crate::config::{ConfigError, DomainAlias, FallbackDomains, UnlockerConfig};

pub use crate::modules::{
    EventDispatcher, EventHandler, LoggingHandler, MetricsCollector, MetricsHandler,
    MetricsSnapshot, UnlockEvent,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
