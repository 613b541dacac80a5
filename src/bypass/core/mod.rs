//! Core utilities shared by the classifier, strategies and dispatcher.

pub mod analysis;
pub mod error;
pub mod extract;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod reqwest_client;
pub mod session;
pub mod types;

pub use analysis::{
    clean_link, dedupe_preserving_order, is_pseudo_href, is_rejected_link, origin_from_url,
    origin_of, resolve_link, swap_origin,
};
pub use error::{BypassError, TransportError};
pub use extract::{
    Capture, ExtractionTier, Page, PatternTier, SCRIPT_REDIRECT_PATTERNS,
    SCRIPT_VARIABLE_PATTERNS, ScriptBodyTier, SelectorTier, TierChain,
};
pub use reqwest_client::{DEFAULT_REQUEST_TIMEOUT, ReqwestSessionClient, ReqwestSessionFactory};
pub use session::{
    BypassSession, RequestBody, SessionClientFactory, SessionHttpClient, SessionRequest,
    SessionResponse,
};
pub use types::{CandidateLink, RawOutcome};
