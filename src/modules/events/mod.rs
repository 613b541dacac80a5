//! Event system for the unlock pipeline.
//!
//! Provides hooks for metrics, logging, and custom reactions around every
//! HTTP step and every dispatch outcome.

use chrono::{DateTime, Utc};
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::metrics::{AttemptOutcome, MetricsCollector};
use crate::bypass::classifier::ServiceFamily;
use crate::bypass::dispatch::FailureKind;

/// Structured pre-request event.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub method: Method,
    pub url: Url,
    pub has_cookie: bool,
    pub content_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Structured post-response event.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    pub method: Method,
    pub url: Url,
    pub status: u16,
    pub latency: Duration,
    pub timestamp: DateTime<Utc>,
}

/// A classified link handed to its strategy.
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    pub url: String,
    pub family: ServiceFamily,
    pub timestamp: DateTime<Utc>,
}

/// Strategy finished without a fault.
#[derive(Debug, Clone)]
pub struct OutcomeEvent {
    pub url: String,
    pub family: ServiceFamily,
    pub links: usize,
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FailureEvent {
    pub url: String,
    pub family: ServiceFamily,
    pub kind: FailureKind,
    pub message: String,
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UnsupportedEvent {
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum UnlockEvent {
    Request(RequestEvent),
    Response(ResponseEvent),
    Dispatch(DispatchEvent),
    Completed(OutcomeEvent),
    NotFound(OutcomeEvent),
    Failed(FailureEvent),
    Unsupported(UnsupportedEvent),
}

/// Trait implemented by event handlers.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &UnlockEvent);
}

/// Dispatcher that broadcasts events to registered handlers.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn dispatch(&self, event: UnlockEvent) {
        for handler in &self.handlers {
            handler.handle(&event);
        }
    }
}

/// Logs events using the `log` crate.
#[derive(Debug)]
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &UnlockEvent) {
        match event {
            UnlockEvent::Request(req) => {
                log::debug!(
                    "-> {} {} (cookie={}, content-type={})",
                    req.method,
                    req.url,
                    req.has_cookie,
                    req.content_type.as_deref().unwrap_or("-")
                );
            }
            UnlockEvent::Response(resp) => {
                log::debug!(
                    "<- {} {} -> {} ({:.2}s)",
                    resp.method,
                    resp.url,
                    resp.status,
                    resp.latency.as_secs_f64()
                );
            }
            UnlockEvent::Dispatch(dispatch) => {
                log::debug!("{} -> {} strategy", dispatch.url, dispatch.family);
            }
            UnlockEvent::Completed(done) => {
                log::info!(
                    "{} unlocked {} link(s) from {} in {:.2}s",
                    done.family,
                    done.links,
                    done.url,
                    done.elapsed.as_secs_f64()
                );
            }
            UnlockEvent::NotFound(done) => {
                log::info!("{} found no links on {}", done.family, done.url);
            }
            UnlockEvent::Failed(failure) => {
                log::warn!(
                    "{} failed on {} [{}]: {}",
                    failure.family,
                    failure.url,
                    failure.kind,
                    failure.message
                );
            }
            UnlockEvent::Unsupported(unsupported) => {
                log::info!("unsupported link {}", unsupported.url);
            }
        }
    }
}

/// Metrics handler that feeds the metrics collector.
#[derive(Clone, Debug)]
pub struct MetricsHandler {
    metrics: MetricsCollector,
}

impl MetricsHandler {
    pub fn new(metrics: MetricsCollector) -> Self {
        Self { metrics }
    }
}

impl EventHandler for MetricsHandler {
    fn handle(&self, event: &UnlockEvent) {
        match event {
            UnlockEvent::Response(resp) => self.metrics.record_http(resp.status),
            UnlockEvent::Completed(done) => {
                self.metrics
                    .record_attempt(done.family, AttemptOutcome::Resolved, done.elapsed);
            }
            UnlockEvent::NotFound(done) => {
                self.metrics
                    .record_attempt(done.family, AttemptOutcome::NotFound, done.elapsed);
            }
            UnlockEvent::Failed(failure) => {
                self.metrics.record_attempt(
                    failure.family,
                    AttemptOutcome::Failed(failure.kind),
                    failure.elapsed,
                );
            }
            UnlockEvent::Unsupported(_) => self.metrics.record_unsupported(),
            _ => {}
        }
    }
}
