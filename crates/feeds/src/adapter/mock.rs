//! Mock adapter for tests and dry runs.

use super::BalanceAdapter;
use crate::error::FetchError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

enum MockOutcome {
    Balance(f64),
    Fail(String),
}

/// Adapter returning a fixed balance (or a fixed failure).
///
/// Tracks call counts and the peak number of concurrent calls so fan-out
/// behaviour can be asserted.
pub struct MockBalanceAdapter {
    outcome: MockOutcome,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockBalanceAdapter {
    pub fn balance(amount: f64) -> Self {
        Self::with_outcome(MockOutcome::Balance(amount))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_outcome(MockOutcome::Fail(message.into()))
    }

    fn with_outcome(outcome: MockOutcome) -> Self {
        Self {
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceAdapter for MockBalanceAdapter {
    fn kind(&self) -> &'static str {
        "mock"
    }

    async fn fetch_balance(&self, _token: &str) -> Result<f64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match &self.outcome {
            MockOutcome::Balance(amount) => Ok(*amount),
            MockOutcome::Fail(message) => Err(FetchError::Request(message.clone())),
        }
    }
}
