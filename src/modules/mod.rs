//! Cross-cutting services module
//!
//! Observability around the unlock pipeline: event hooks and in-memory metrics.

pub mod events;
pub mod metrics;

pub use events::{
    DispatchEvent, EventDispatcher, EventHandler, FailureEvent, LoggingHandler, MetricsHandler,
    OutcomeEvent, RequestEvent, ResponseEvent, UnlockEvent, UnsupportedEvent,
};
pub use metrics::{AttemptOutcome, FamilyStats, GlobalStats, MetricsCollector, MetricsSnapshot};
