//! Metrics collection utilities.
//!
//! Provides aggregated global and per-family statistics with latency
//! percentiles for observability. Everything is in memory.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::bypass::classifier::ServiceFamily;
use crate::bypass::dispatch::FailureKind;

/// How one bypass attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Resolved,
    NotFound,
    Failed(FailureKind),
}

/// Aggregated metrics across all families.
#[derive(Debug, Clone)]
pub struct GlobalStats {
    pub started_at: DateTime<Utc>,
    pub attempts: u64,
    pub resolved: u64,
    pub not_found: u64,
    pub failures: u64,
    pub unsupported: u64,
    pub http_requests: u64,
    pub http_errors: u64,
    pub average_latency: Option<Duration>,
    pub p95_latency: Option<Duration>,
}

impl Default for GlobalStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            attempts: 0,
            resolved: 0,
            not_found: 0,
            failures: 0,
            unsupported: 0,
            http_requests: 0,
            http_errors: 0,
            average_latency: None,
            p95_latency: None,
        }
    }
}

/// Family-scoped metrics snapshot.
#[derive(Debug, Clone)]
pub struct FamilyStats {
    pub family: ServiceFamily,
    pub attempts: u64,
    pub resolved: u64,
    pub not_found: u64,
    pub failures: u64,
    pub average_latency: Option<Duration>,
    pub p95_latency: Option<Duration>,
    pub consecutive_failures: u32,
    pub last_failure: Option<FailureKind>,
}

impl FamilyStats {
    fn from_accumulator(family: ServiceFamily, acc: &FamilyAccumulator) -> Self {
        let (avg, p95) = latency_stats(acc.latencies.iter().copied());
        Self {
            family,
            attempts: acc.attempts,
            resolved: acc.resolved,
            not_found: acc.not_found,
            failures: acc.failures,
            average_latency: avg,
            p95_latency: p95,
            consecutive_failures: acc.consecutive_failures,
            last_failure: acc.last_failure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub global: GlobalStats,
    pub families: Vec<FamilyStats>,
}

#[derive(Debug)]
struct FamilyAccumulator {
    attempts: u64,
    resolved: u64,
    not_found: u64,
    failures: u64,
    latencies: VecDeque<Duration>,
    max_window: usize,
    consecutive_failures: u32,
    last_failure: Option<FailureKind>,
}

impl FamilyAccumulator {
    fn new(max_window: usize) -> Self {
        Self {
            attempts: 0,
            resolved: 0,
            not_found: 0,
            failures: 0,
            latencies: VecDeque::with_capacity(max_window),
            max_window,
            consecutive_failures: 0,
            last_failure: None,
        }
    }

    fn record(&mut self, outcome: AttemptOutcome, latency: Duration) {
        self.attempts += 1;
        match outcome {
            AttemptOutcome::Resolved => {
                self.resolved += 1;
                self.consecutive_failures = 0;
            }
            AttemptOutcome::NotFound => {
                self.not_found += 1;
                self.consecutive_failures = 0;
            }
            AttemptOutcome::Failed(kind) => {
                self.failures += 1;
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.last_failure = Some(kind);
            }
        }

        if self.latencies.len() == self.max_window {
            self.latencies.pop_front();
        }
        self.latencies.push_back(latency);
    }
}

fn latency_stats(samples: impl Iterator<Item = Duration>) -> (Option<Duration>, Option<Duration>) {
    let mut samples: Vec<_> = samples.collect();
    if samples.is_empty() {
        return (None, None);
    }
    samples.sort_unstable();
    let avg = samples.iter().map(|d| d.as_secs_f64()).sum::<f64>() / samples.len() as f64;
    let p95_index = ((samples.len() as f64 * 0.95).ceil() as usize).saturating_sub(1);
    (Some(Duration::from_secs_f64(avg)), Some(samples[p95_index]))
}

#[derive(Debug)]
struct MetricsState {
    global: GlobalStats,
    max_window: usize,
    families: BTreeMap<ServiceFamily, FamilyAccumulator>,
}

impl MetricsState {
    fn new(max_window: usize) -> Self {
        Self {
            global: GlobalStats::default(),
            max_window,
            families: BTreeMap::new(),
        }
    }

    fn accumulator_mut(&mut self, family: ServiceFamily) -> &mut FamilyAccumulator {
        let window = self.max_window;
        self.families
            .entry(family)
            .or_insert_with(|| FamilyAccumulator::new(window))
    }
}

/// Thread-safe metrics collector shared by the dispatcher and callers.
#[derive(Clone, Debug)]
pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_window(128)
    }

    pub fn with_window(window: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetricsState::new(window.max(16)))),
        }
    }

    // Counters stay usable even if a handler panicked mid-update.
    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_attempt(&self, family: ServiceFamily, outcome: AttemptOutcome, latency: Duration) {
        let mut guard = self.lock();
        guard.global.attempts += 1;
        match outcome {
            AttemptOutcome::Resolved => guard.global.resolved += 1,
            AttemptOutcome::NotFound => guard.global.not_found += 1,
            AttemptOutcome::Failed(_) => guard.global.failures += 1,
        }

        guard.accumulator_mut(family).record(outcome, latency);

        let all = guard
            .families
            .values()
            .flat_map(|acc| acc.latencies.iter().copied())
            .collect::<Vec<_>>();
        let (avg, p95) = latency_stats(all.into_iter());
        guard.global.average_latency = avg;
        guard.global.p95_latency = p95;
    }

    pub fn record_unsupported(&self) {
        self.lock().global.unsupported += 1;
    }

    pub fn record_http(&self, status: u16) {
        let mut guard = self.lock();
        guard.global.http_requests += 1;
        if status >= 400 {
            guard.global.http_errors += 1;
        }
    }

    pub fn family(&self, family: ServiceFamily) -> Option<FamilyStats> {
        let guard = self.lock();
        guard
            .families
            .get(&family)
            .map(|acc| FamilyStats::from_accumulator(family, acc))
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let guard = self.lock();
        let families = guard
            .families
            .iter()
            .map(|(family, acc)| FamilyStats::from_accumulator(*family, acc))
            .collect();
        MetricsSnapshot {
            global: guard.global.clone(),
            families,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_outcomes_per_family() {
        let metrics = MetricsCollector::new();
        metrics.record_attempt(ServiceFamily::HubDrive, AttemptOutcome::Resolved, Duration::from_millis(150));
        metrics.record_attempt(
            ServiceFamily::HubDrive,
            AttemptOutcome::Failed(FailureKind::Transport),
            Duration::from_millis(800),
        );
        metrics.record_attempt(
            ServiceFamily::HubDrive,
            AttemptOutcome::Failed(FailureKind::Timeout),
            Duration::from_millis(900),
        );
        metrics.record_attempt(ServiceFamily::Gyani, AttemptOutcome::NotFound, Duration::from_millis(90));

        let hubdrive = metrics.family(ServiceFamily::HubDrive).unwrap();
        assert_eq!(hubdrive.attempts, 3);
        assert_eq!(hubdrive.resolved, 1);
        assert_eq!(hubdrive.failures, 2);
        assert_eq!(hubdrive.consecutive_failures, 2);
        assert_eq!(hubdrive.last_failure, Some(FailureKind::Timeout));
        assert_eq!(hubdrive.p95_latency, Some(Duration::from_millis(900)));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.global.attempts, 4);
        assert_eq!(snapshot.global.not_found, 1);
        assert_eq!(snapshot.families.len(), 2);
        assert!(metrics.family(ServiceFamily::GDFlix).is_none());
    }

    #[test]
    fn http_statuses_are_tallied() {
        let metrics = MetricsCollector::new();
        metrics.record_http(200);
        metrics.record_http(302);
        metrics.record_http(503);
        let global = metrics.snapshot().global;
        assert_eq!(global.http_requests, 3);
        assert_eq!(global.http_errors, 1);
    }
}
