//! Link bypass engine.
//!
//! Layers, leaf first: HTTP session plumbing and extraction tiers (`core`),
//! domain classification, per-service strategies, result normalization and
//! the dispatch façade that ties them together.

pub mod classifier;
pub mod core;
pub mod dispatch;
pub mod normalizer;
pub mod strategies;
pub mod user_agents;

pub use classifier::{Classification, DomainClassifier, ServiceFamily, UnknownFamily};
pub use dispatch::{
    BypassFailure, DEFAULT_DISPATCH_TIMEOUT, DispatchOutcome, Dispatcher, FailureKind,
    StrategyRegistry,
};
pub use normalizer::{BypassResult, LinkBundle, normalize};
pub use strategies::BypassStrategy;
pub use user_agents::{UserAgentError, UserAgentOptions, select_user_agent};
