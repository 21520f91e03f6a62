//! Balance time-series storage port.
//!
//! The engine only appends samples, reads a recent window, registers
//! partners and purges old rows. Storage internals live behind
//! [`BalanceStore`].

use async_trait::async_trait;
use balance_core::BalanceSample;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Partner {partner} not found in network {network}")]
    PartnerNotFound { partner: String, network: String },
}

/// Persistence interface for balance samples.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Register a partner in a network or update its active flag.
    async fn upsert_partner(
        &self,
        partner: &str,
        network: &str,
        is_active: bool,
    ) -> Result<(), StoreError>;

    /// Append one sample. Fails with [`StoreError::PartnerNotFound`] if the
    /// partner was never registered in the sample's network.
    async fn append_balance(&self, sample: &BalanceSample) -> Result<(), StoreError>;

    /// Amounts recorded since [`window_start`] for `lookback_days`, oldest first.
    async fn read_recent_balances(
        &self,
        partner: &str,
        network: &str,
        lookback_days: u32,
    ) -> Result<Vec<f64>, StoreError>;

    /// Delete samples older than [`window_start`] for `retention_days`.
    /// Returns the number of deleted samples.
    async fn purge_older_than(&self, network: &str, retention_days: u32) -> Result<u64, StoreError>;
}

/// Start of a window of `days` whole days: midnight UTC, `days` before today.
pub fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
    midnight - Duration::days(i64::from(days))
}

#[derive(Debug, Default)]
struct PartnerRow {
    is_active: bool,
    samples: Vec<(DateTime<Utc>, f64)>,
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryBalanceStore {
    rows: Mutex<HashMap<(String, String), PartnerRow>>,
}

impl InMemoryBalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample with an explicit timestamp, registering the partner
    /// if needed. Used to seed histories.
    pub fn seed(&self, partner: &str, network: &str, recorded_at: DateTime<Utc>, amount: f64) {
        if let Ok(mut rows) = self.rows.lock() {
            let row = rows
                .entry((network.to_string(), partner.to_string()))
                .or_insert_with(|| PartnerRow {
                    is_active: true,
                    samples: Vec::new(),
                });
            row.samples.push((recorded_at, amount));
        }
    }

    /// Every stored amount for a partner, oldest first.
    pub fn samples(&self, partner: &str, network: &str) -> Vec<f64> {
        let Ok(rows) = self.rows.lock() else {
            return Vec::new();
        };
        let Some(row) = rows.get(&(network.to_string(), partner.to_string())) else {
            return Vec::new();
        };
        let mut samples = row.samples.clone();
        samples.sort_by_key(|(at, _)| *at);
        samples.into_iter().map(|(_, amount)| amount).collect()
    }

    pub fn is_active(&self, partner: &str, network: &str) -> Option<bool> {
        let rows = self.rows.lock().ok()?;
        rows.get(&(network.to_string(), partner.to_string()))
            .map(|row| row.is_active)
    }
}

fn poisoned() -> StoreError {
    StoreError::Database("lock poisoned".to_string())
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn upsert_partner(
        &self,
        partner: &str,
        network: &str,
        is_active: bool,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        rows.entry((network.to_string(), partner.to_string()))
            .or_default()
            .is_active = is_active;
        Ok(())
    }

    async fn append_balance(&self, sample: &BalanceSample) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        let row = rows
            .get_mut(&(sample.network.clone(), sample.partner.clone()))
            .ok_or_else(|| StoreError::PartnerNotFound {
                partner: sample.partner.clone(),
                network: sample.network.clone(),
            })?;
        row.samples.push((sample.recorded_at, sample.amount));
        Ok(())
    }

    async fn read_recent_balances(
        &self,
        partner: &str,
        network: &str,
        lookback_days: u32,
    ) -> Result<Vec<f64>, StoreError> {
        let rows = self.rows.lock().map_err(|_| poisoned())?;
        let row = rows
            .get(&(network.to_string(), partner.to_string()))
            .ok_or_else(|| StoreError::PartnerNotFound {
                partner: partner.to_string(),
                network: network.to_string(),
            })?;

        let since = window_start(Utc::now(), lookback_days);
        let mut recent: Vec<(DateTime<Utc>, f64)> = row
            .samples
            .iter()
            .filter(|(at, _)| *at >= since)
            .copied()
            .collect();
        recent.sort_by_key(|(at, _)| *at);
        Ok(recent.into_iter().map(|(_, amount)| amount).collect())
    }

    async fn purge_older_than(&self, network: &str, retention_days: u32) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().map_err(|_| poisoned())?;
        let cutoff = window_start(Utc::now(), retention_days);
        let mut deleted = 0u64;
        for ((row_network, _), row) in rows.iter_mut() {
            if row_network != network {
                continue;
            }
            let before = row.samples.len();
            row.samples.retain(|(at, _)| *at >= cutoff);
            deleted += (before - row.samples.len()) as u64;
        }
        Ok(deleted)
    }
}
