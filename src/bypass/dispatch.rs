//! Dispatch façade.
//!
//! Takes a raw URL, classifies it, runs the matching strategy inside a fresh
//! session under a deadline and hands back a normalized value. Nothing raises
//! past this boundary: unsupported links, strategy faults, timeouts and even
//! strategy panics all come back as [`DispatchOutcome`] values.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use url::Url;

use crate::bypass::classifier::{DomainClassifier, ServiceFamily};
use crate::bypass::core::{BypassError, BypassSession, SessionClientFactory, TransportError};
use crate::bypass::normalizer::{BypassResult, normalize};
use crate::bypass::strategies::BypassStrategy;
use crate::bypass::user_agents::DESKTOP_USER_AGENT;
use crate::modules::events::{
    DispatchEvent, EventDispatcher, FailureEvent, OutcomeEvent, UnlockEvent, UnsupportedEvent,
};

pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Coarse failure category reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Session,
    TokenExtraction,
    Transport,
    Timeout,
    Parse,
    Configuration,
    Internal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Session => "session",
            FailureKind::TokenExtraction => "token_extraction",
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::Parse => "parse",
            FailureKind::Configuration => "configuration",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed attempt with a human-readable cause.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct BypassFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl BypassFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<BypassError> for BypassFailure {
    fn from(err: BypassError) -> Self {
        let kind = match &err {
            BypassError::Session(_) => FailureKind::Session,
            BypassError::TokenExtraction(_) => FailureKind::TokenExtraction,
            BypassError::Transport(TransportError::Timeout(_)) => FailureKind::Timeout,
            BypassError::Transport(_) => FailureKind::Transport,
            // raised inside a strategy only for URLs scraped off a page
            BypassError::UnsupportedLink(_) => FailureKind::Parse,
            BypassError::Parse(_) | BypassError::NotFound => FailureKind::Parse,
        };
        Self::new(kind, err.to_string())
    }
}

/// Everything [`Dispatcher::handle`] can answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Resolved(BypassResult),
    Unsupported(String),
    Failure(BypassFailure),
}

impl DispatchOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn result(&self) -> Option<&BypassResult> {
        match self {
            Self::Resolved(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&BypassFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Strategy per family; immutable once the dispatcher is built.
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<ServiceFamily, Arc<dyn BypassStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the strategy for its own family.
    pub fn register(&mut self, strategy: Arc<dyn BypassStrategy>) {
        self.strategies.insert(strategy.family(), strategy);
    }

    pub fn with(mut self, strategy: Arc<dyn BypassStrategy>) -> Self {
        self.register(strategy);
        self
    }

    pub fn get(&self, family: ServiceFamily) -> Option<Arc<dyn BypassStrategy>> {
        self.strategies.get(&family).cloned()
    }

    pub fn families(&self) -> Vec<ServiceFamily> {
        let mut families: Vec<_> = self.strategies.keys().copied().collect();
        families.sort();
        families
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

/// Aborts the strategy task when the dispatcher stops waiting for it.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct Dispatcher {
    classifier: DomainClassifier,
    registry: StrategyRegistry,
    factory: Arc<dyn SessionClientFactory>,
    user_agent: String,
    timeout: Duration,
    events: Arc<EventDispatcher>,
}

impl Dispatcher {
    pub fn new(
        classifier: DomainClassifier,
        registry: StrategyRegistry,
        factory: Arc<dyn SessionClientFactory>,
    ) -> Self {
        Self {
            classifier,
            registry,
            factory,
            user_agent: DESKTOP_USER_AGENT.to_string(),
            timeout: DEFAULT_DISPATCH_TIMEOUT,
            events: Arc::new(EventDispatcher::new()),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = events;
        self
    }

    pub fn classifier(&self) -> &DomainClassifier {
        &self.classifier
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn classify(&self, url: &str) -> Option<ServiceFamily> {
        self.classifier.classify(url)
    }

    /// Classify, unlock and normalize one link.
    pub async fn handle(&self, url: &str) -> DispatchOutcome {
        let url = url.trim();

        let Some(hit) = self.classifier.classify_detailed(url) else {
            return self.unsupported(url);
        };
        let parsed = match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
            _ => return self.unsupported(url),
        };
        log::debug!(
            "{url} classified as {} via `{}`{}",
            hit.family,
            hit.pattern,
            if hit.is_alias { " (alias)" } else { "" }
        );

        let started = Instant::now();
        let outcome = self.run(hit.family, parsed).await;
        self.report(url, hit.family, &outcome, started.elapsed());
        outcome
    }

    async fn run(&self, family: ServiceFamily, url: Url) -> DispatchOutcome {
        let Some(strategy) = self.registry.get(family) else {
            return DispatchOutcome::Failure(BypassFailure::new(
                FailureKind::Configuration,
                format!("no strategy registered for {family}"),
            ));
        };

        let mut session = match self.open_session() {
            Ok(session) => session,
            Err(failure) => return DispatchOutcome::Failure(failure),
        };

        self.events.dispatch(UnlockEvent::Dispatch(DispatchEvent {
            url: url.to_string(),
            family,
            timestamp: Utc::now(),
        }));

        let mut task = AbortOnDrop(tokio::spawn(async move {
            strategy.bypass(&mut session, &url).await
        }));

        match tokio::time::timeout(self.timeout, &mut task.0).await {
            Err(_) => DispatchOutcome::Failure(BypassFailure::new(
                FailureKind::Timeout,
                format!("gave up after {:?}", self.timeout),
            )),
            Ok(Err(join_err)) => {
                let message = if join_err.is_panic() {
                    "strategy panicked"
                } else {
                    "strategy task was cancelled"
                };
                DispatchOutcome::Failure(BypassFailure::new(FailureKind::Internal, message))
            }
            Ok(Ok(Ok(raw))) => DispatchOutcome::Resolved(normalize(family, raw)),
            Ok(Ok(Err(BypassError::NotFound))) => DispatchOutcome::Resolved(BypassResult::NotFound),
            Ok(Ok(Err(err))) => DispatchOutcome::Failure(err.into()),
        }
    }

    fn open_session(&self) -> Result<BypassSession, BypassFailure> {
        let client = self.factory.create().map_err(|err| {
            BypassFailure::new(FailureKind::Configuration, format!("cannot build http client: {err}"))
        })?;
        BypassSession::new(client)
            .with_events(self.events.clone())
            .with_user_agent(&self.user_agent)
            .map_err(|err| BypassFailure::new(FailureKind::Configuration, err.to_string()))
    }

    fn unsupported(&self, url: &str) -> DispatchOutcome {
        self.events.dispatch(UnlockEvent::Unsupported(UnsupportedEvent {
            url: url.to_string(),
            timestamp: Utc::now(),
        }));
        DispatchOutcome::Unsupported(url.to_string())
    }

    fn report(&self, url: &str, family: ServiceFamily, outcome: &DispatchOutcome, elapsed: Duration) {
        let event = match outcome {
            DispatchOutcome::Resolved(BypassResult::Found(bundle)) => {
                UnlockEvent::Completed(OutcomeEvent {
                    url: url.to_string(),
                    family,
                    links: bundle.links.len(),
                    elapsed,
                    timestamp: Utc::now(),
                })
            }
            DispatchOutcome::Resolved(BypassResult::NotFound) => UnlockEvent::NotFound(OutcomeEvent {
                url: url.to_string(),
                family,
                links: 0,
                elapsed,
                timestamp: Utc::now(),
            }),
            DispatchOutcome::Failure(failure) => UnlockEvent::Failed(FailureEvent {
                url: url.to_string(),
                family,
                kind: failure.kind,
                message: failure.message.clone(),
                elapsed,
                timestamp: Utc::now(),
            }),
            DispatchOutcome::Unsupported(_) => return,
        };
        self.events.dispatch(event);
    }
}
