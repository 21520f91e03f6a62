//! Top-level operations used by the scheduler, the HTTP endpoint and the
//! chat bot.
//!
//! Each call takes a fresh snapshot of the networks config, so partner
//! toggles apply on the next invocation.

use crate::alert::AlertEngine;
use crate::collector::{BatchSummary, Collector};
use crate::store::{BalanceStore, StoreError};
use balance_core::{ConfigError, NetworksConfig, NetworksSource};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Retention and lookback settings.
#[derive(Debug, Clone, Copy)]
pub struct ServiceConfig {
    pub lookback_days: u32,
    pub retention_days: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            lookback_days: crate::statistics::DEFAULT_LOOKBACK_DAYS,
            retention_days: 7,
        }
    }
}

pub struct BalanceService {
    source: NetworksSource,
    collector: Arc<Collector>,
    alerts: AlertEngine,
    store: Arc<dyn BalanceStore>,
    config: ServiceConfig,
}

impl BalanceService {
    pub fn new(
        source: NetworksSource,
        collector: Arc<Collector>,
        store: Arc<dyn BalanceStore>,
        config: ServiceConfig,
    ) -> Self {
        let alerts = AlertEngine::new(collector.clone(), store.clone(), config.lookback_days);
        Self {
            source,
            collector,
            alerts,
            store,
            config,
        }
    }

    fn snapshot(&self) -> Result<NetworksConfig, ServiceError> {
        Ok(self.source.snapshot()?)
    }

    /// Register every configured partner with the store. Returns the number
    /// of roster rows written.
    pub async fn sync_partners(&self) -> Result<usize, ServiceError> {
        let roster = self.snapshot()?.roster();
        for entry in &roster {
            self.store
                .upsert_partner(&entry.partner, &entry.network, entry.is_active)
                .await?;
        }
        info!(partners = roster.len(), "Partners synced");
        Ok(roster.len())
    }

    /// Fetch and persist balances for every active group.
    pub async fn collect_all(&self) -> Result<Vec<BatchSummary>, ServiceError> {
        let groups = self.snapshot()?.active_groups();
        Ok(self.collector.collect_all(&groups).await)
    }

    /// Purge samples past retention in every configured network. A failing
    /// network is logged and skipped.
    pub async fn purge(&self) -> Result<u64, ServiceError> {
        let mut deleted = 0;
        for network in self.snapshot()?.network_names() {
            match self
                .store
                .purge_older_than(&network, self.config.retention_days)
                .await
            {
                Ok(n) => {
                    debug!(network = %network, deleted = n, "Purged old balances");
                    deleted += n;
                }
                Err(e) => error!(network = %network, error = %e, "Purge failed"),
            }
        }
        info!(deleted, retention_days = self.config.retention_days, "Purge finished");
        Ok(deleted)
    }

    /// Rendered alert report, empty when there is nothing to report.
    pub async fn stat(&self, network: &str) -> Result<String, ServiceError> {
        let Some(group) = self.snapshot()?.group(network) else {
            debug!(network, "No active partners");
            return Ok(String::new());
        };
        Ok(self.alerts.build_report(&group).await.render())
    }

    /// Rendered balance listing, empty when no balance could be read.
    pub async fn balances(&self, network: &str) -> Result<String, ServiceError> {
        let Some(group) = self.snapshot()?.group(network) else {
            debug!(network, "No active partners");
            return Ok(String::new());
        };
        Ok(self.alerts.build_balance_listing(&group).await.render())
    }

    pub fn network_names(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.snapshot()?.network_names())
    }
}
