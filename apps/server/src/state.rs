//! Application state management.

use balance_engine::BatchSummary;
use balance_alerts::DeliveryStats;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the running service.
#[derive(Debug, Default)]
pub struct ServiceStats {
    /// Completed collection batches.
    pub batches_run: AtomicU64,
    /// Balance samples written.
    pub samples_persisted: AtomicU64,
    /// Partner units that failed to fetch or persist.
    pub unit_failures: AtomicU64,
    /// Reports delivered to chat threads.
    pub reports_sent: AtomicU64,
    /// Requests served on the HTTP endpoint.
    pub rpc_requests: AtomicU64,
    /// Start time in milliseconds.
    pub started_at_ms: AtomicU64,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            started_at_ms: AtomicU64::new(now_ms()),
            ..Default::default()
        }
    }

    pub fn record_batch(&self, summary: &BatchSummary) {
        self.batches_run.fetch_add(1, Ordering::Relaxed);
        self.samples_persisted
            .fetch_add(summary.succeeded() as u64, Ordering::Relaxed);
        self.unit_failures
            .fetch_add(summary.failed() as u64, Ordering::Relaxed);
    }

    pub fn record_delivery(&self, delivery: &DeliveryStats) {
        self.reports_sent
            .fetch_add(delivery.sent as u64, Ordering::Relaxed);
    }

    pub fn record_rpc_request(&self) {
        self.rpc_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> u64 {
        now_ms().saturating_sub(self.started_at_ms.load(Ordering::Relaxed)) / 1000
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            batches_run: self.batches_run.load(Ordering::Relaxed),
            samples_persisted: self.samples_persisted.load(Ordering::Relaxed),
            unit_failures: self.unit_failures.load(Ordering::Relaxed),
            reports_sent: self.reports_sent.load(Ordering::Relaxed),
            rpc_requests: self.rpc_requests.load(Ordering::Relaxed),
            uptime_secs: self.uptime_secs(),
        }
    }
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Summary of statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSummary {
    pub batches_run: u64,
    pub samples_persisted: u64,
    pub unit_failures: u64,
    pub reports_sent: u64,
    pub rpc_requests: u64,
    pub uptime_secs: u64,
}

/// State shared by the background jobs and the HTTP endpoint.
#[derive(Debug, Default)]
pub struct AppState {
    pub stats: ServiceStats,
    running: AtomicBool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            stats: ServiceStats::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Shared state handle.
pub type SharedState = Arc<AppState>;

pub fn create_state() -> SharedState {
    Arc::new(AppState::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_engine::UnitOutcome;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_start_stop() {
        let state = create_state();
        assert!(!state.is_running());
        state.start();
        assert!(state.is_running());
        state.stop();
        assert!(!state.is_running());
    }

    #[test]
    fn test_record_batch() {
        let stats = ServiceStats::new();
        let mut summary = BatchSummary {
            network: "adrich".to_string(),
            ..Default::default()
        };
        summary
            .outcomes
            .insert("A".to_string(), UnitOutcome::Persisted { balance: 1.0 });
        summary.outcomes.insert(
            "B".to_string(),
            UnitOutcome::FetchFailed {
                error: "down".to_string(),
            },
        );

        stats.record_batch(&summary);
        stats.record_delivery(&DeliveryStats { sent: 2, empty: 1, failed: 0 });
        stats.record_rpc_request();

        let summary = stats.summary();
        assert_eq!(summary.batches_run, 1);
        assert_eq!(summary.samples_persisted, 1);
        assert_eq!(summary.unit_failures, 1);
        assert_eq!(summary.reports_sent, 2);
        assert_eq!(summary.rpc_requests, 1);
    }
}
