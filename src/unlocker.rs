//! High level unlocker orchestration.
//!
//! Wires the classifier, the default strategy set, the session factory and the
//! observability handlers into one [`LinkUnlocker`] that callers feed raw URLs.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::bypass::classifier::{DomainClassifier, ServiceFamily};
use crate::bypass::core::{ReqwestSessionFactory, SessionClientFactory};
use crate::bypass::dispatch::{DispatchOutcome, Dispatcher, StrategyRegistry};
use crate::bypass::strategies::{
    BypassStrategy, FastiLinksStrategy, GdflixStrategy, GyaniStrategy, HdHubStrategy,
    HubCdnStrategy, HubCloudStrategy, HubDriveStrategy, MirrorResolver, PhotoLinxStrategy,
    gdflix,
};
use crate::bypass::user_agents::{UserAgentError, UserAgentOptions, select_user_agent};
use crate::config::{ConfigError, DomainAlias, FallbackDomains, UnlockerConfig};
use crate::modules::events::{EventDispatcher, EventHandler, LoggingHandler, MetricsHandler};
use crate::modules::metrics::MetricsCollector;

/// Result alias used across the orchestration layer.
pub type UnlockerResult<T> = Result<T, UnlockerError>;

/// Errors raised while building an unlocker. Handling a link never fails.
#[derive(Debug, Error)]
pub enum UnlockerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("user-agent initialisation failed: {0}")]
    UserAgent(#[from] UserAgentError),
    #[error("invalid alias pattern '{pattern}' for {family}: {source}")]
    Alias {
        family: ServiceFamily,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Fluent builder for [`LinkUnlocker`].
pub struct LinkUnlockerBuilder {
    config: UnlockerConfig,
    factory: Option<Arc<dyn SessionClientFactory>>,
    overrides: Vec<Arc<dyn BypassStrategy>>,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl LinkUnlockerBuilder {
    pub fn new() -> Self {
        Self {
            config: UnlockerConfig::default(),
            factory: None,
            overrides: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: UnlockerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.config.dispatch_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_manifest_url(mut self, url: impl Into<String>) -> Self {
        self.config.manifest_url = url.into();
        self
    }

    pub fn with_manifest_timeout(mut self, timeout: Duration) -> Self {
        self.config.manifest_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_fallback_domains(mut self, domains: FallbackDomains) -> Self {
        self.config.fallback_domains = domains;
        self
    }

    /// Route hosts matching `pattern` (case-insensitive regex) to `family`.
    pub fn with_alias(mut self, family: ServiceFamily, pattern: impl Into<String>) -> Self {
        self.config.aliases.push(DomainAlias {
            family,
            pattern: pattern.into(),
        });
        self
    }

    pub fn with_user_agent_options(mut self, options: UserAgentOptions) -> Self {
        self.config.user_agent = options;
        self
    }

    /// Replace the reqwest-backed transport.
    pub fn with_session_factory(mut self, factory: Arc<dyn SessionClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Replace the built-in strategy for `strategy.family()`.
    pub fn with_strategy(mut self, strategy: Arc<dyn BypassStrategy>) -> Self {
        self.overrides.push(strategy);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn disable_metrics(mut self) -> Self {
        self.config.enable_metrics = false;
        self
    }

    pub fn disable_logging(mut self) -> Self {
        self.config.enable_logging = false;
        self
    }

    pub fn build(self) -> UnlockerResult<LinkUnlocker> {
        LinkUnlocker::from_parts(self)
    }
}

impl Default for LinkUnlockerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_registry(config: &UnlockerConfig) -> StrategyRegistry {
    let manifest_key = config
        .manifest_key(ServiceFamily::GDFlix)
        .unwrap_or(gdflix::MANIFEST_KEY);
    let resolver = MirrorResolver::new(manifest_key, &config.fallback_domains.gdflix)
        .with_manifest_url(&config.manifest_url)
        .with_timeout(config.manifest_timeout());

    StrategyRegistry::new()
        .with(Arc::new(PhotoLinxStrategy::with_fallback_origin(
            &config.fallback_domains.photolinx,
        )))
        .with(Arc::new(HubDriveStrategy::new()))
        .with(Arc::new(HubCloudStrategy::new()))
        .with(Arc::new(HubCdnStrategy::new()))
        .with(Arc::new(GyaniStrategy::new()))
        .with(Arc::new(GdflixStrategy::with_resolver(resolver)))
        .with(Arc::new(HdHubStrategy::new()))
        .with(Arc::new(FastiLinksStrategy::with_fallback_origin(
            &config.fallback_domains.fastilinks,
        )))
}

/// Main unlocker. Cheap to share behind an `Arc`; every call gets its own session.
pub struct LinkUnlocker {
    config: UnlockerConfig,
    dispatcher: Dispatcher,
    metrics: Option<MetricsCollector>,
}

impl LinkUnlocker {
    /// Construct an unlocker with default configuration.
    pub fn new() -> UnlockerResult<Self> {
        LinkUnlockerBuilder::new().build()
    }

    pub fn builder() -> LinkUnlockerBuilder {
        LinkUnlockerBuilder::new()
    }

    pub fn from_config(config: UnlockerConfig) -> UnlockerResult<Self> {
        LinkUnlockerBuilder::new().with_config(config).build()
    }

    fn from_parts(builder: LinkUnlockerBuilder) -> UnlockerResult<Self> {
        let LinkUnlockerBuilder {
            config,
            factory,
            overrides,
            handlers,
        } = builder;
        config.validate()?;

        let user_agent = select_user_agent(&config.user_agent)?;

        let mut classifier = DomainClassifier::new();
        for alias in &config.aliases {
            classifier = classifier
                .with_alias(alias.family, &alias.pattern)
                .map_err(|source| UnlockerError::Alias {
                    family: alias.family,
                    pattern: alias.pattern.clone(),
                    source,
                })?;
        }

        let mut registry = default_registry(&config);
        for strategy in overrides {
            registry.register(strategy);
        }

        let factory = factory
            .unwrap_or_else(|| Arc::new(ReqwestSessionFactory::new(config.request_timeout())));

        let metrics = config.enable_metrics.then(MetricsCollector::new);
        let mut events = EventDispatcher::new();
        if config.enable_logging {
            events.register_handler(Arc::new(LoggingHandler));
        }
        if let Some(ref collector) = metrics {
            events.register_handler(Arc::new(MetricsHandler::new(collector.clone())));
        }
        for handler in handlers {
            events.register_handler(handler);
        }

        let dispatcher = Dispatcher::new(classifier, registry, factory)
            .with_user_agent(user_agent)
            .with_timeout(config.dispatch_timeout())
            .with_events(Arc::new(events));

        log::debug!(
            "link unlocker ready: {} strategies, {} alias(es)",
            dispatcher.registry().len(),
            config.aliases.len()
        );

        Ok(Self {
            config,
            dispatcher,
            metrics,
        })
    }

    /// Unlock one link. Never fails; every problem is a [`DispatchOutcome`] value.
    pub async fn handle(&self, url: &str) -> DispatchOutcome {
        self.dispatcher.handle(url).await
    }

    pub fn classify(&self, url: &str) -> Option<ServiceFamily> {
        self.dispatcher.classify(url)
    }

    pub fn supported_families(&self) -> Vec<ServiceFamily> {
        self.dispatcher.registry().families()
    }

    pub fn metrics(&self) -> Option<&MetricsCollector> {
        self.metrics.as_ref()
    }

    pub fn config(&self) -> &UnlockerConfig {
        &self.config
    }
}
