//! Spend estimation from balance history.
//!
//! Partners are topped up regularly, so consecutive increases in the balance
//! history are read as the amount spent between top-ups. Decreases and
//! samples touching zero are noise and are dropped.

use crate::store::BalanceStore;
use balance_core::{round_to, NetworkGroup, SpendEstimate};
use std::collections::BTreeMap;
use tracing::{error, warn};

/// Weight applied to every positive delta.
pub const SPEND_WEIGHT: f64 = 4.0;

/// Default history window in days.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 3;

/// Positive deltas between consecutive samples (oldest first).
///
/// A pair is kept only when both samples are non-zero and the newer one is
/// strictly larger.
pub fn positive_deltas(history: &[f64]) -> Vec<f64> {
    history
        .windows(2)
        .filter_map(|pair| {
            let (prev, curr) = (pair[0], pair[1]);
            (prev != 0.0 && curr != 0.0 && curr > prev).then(|| curr - prev)
        })
        .collect()
}

/// Weighted mean of the deltas, rounded to cents. Empty input gives `0`.
pub fn weighted_mean(deltas: &[f64]) -> f64 {
    if deltas.is_empty() {
        return 0.0;
    }
    let total: f64 = deltas.iter().map(|d| d * SPEND_WEIGHT).sum();
    round_to(total / deltas.len() as f64, 2)
}

/// Expected spend for a chronological balance history.
pub fn estimate_spend(history: &[f64]) -> f64 {
    weighted_mean(&positive_deltas(history))
}

/// Computes spend estimates from stored history.
pub struct SpendEstimator<'a> {
    store: &'a dyn BalanceStore,
    lookback_days: u32,
}

impl<'a> SpendEstimator<'a> {
    pub fn new(store: &'a dyn BalanceStore, lookback_days: u32) -> Self {
        Self {
            store,
            lookback_days,
        }
    }

    /// Estimate for one partner. `None` when there is no history in the
    /// window or it could not be read.
    pub async fn estimate(&self, partner: &str, network: &str) -> Option<SpendEstimate> {
        let history = match self
            .store
            .read_recent_balances(partner, network, self.lookback_days)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                error!(network, partner, error = %e, "Failed to read balance history");
                return None;
            }
        };

        if history.is_empty() {
            warn!(network, partner, "No balance history in window");
            return None;
        }

        Some(SpendEstimate {
            partner: partner.to_string(),
            value: estimate_spend(&history),
        })
    }

    /// Estimates for every partner of the group that has history.
    pub async fn estimate_group(&self, group: &NetworkGroup) -> BTreeMap<String, f64> {
        let mut estimates = BTreeMap::new();
        for partner in group.partners() {
            if let Some(estimate) = self.estimate(partner.name(), group.name()).await {
                estimates.insert(estimate.partner, estimate.value);
            }
        }
        estimates
    }
}
