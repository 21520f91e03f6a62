//! Concurrent balance collection.
//!
//! One unit of work per partner. Units run concurrently (optionally bounded)
//! and are joined before a batch returns. A failing partner never stops its
//! siblings; outcomes are reported per unit instead of as a batch error.

use crate::router::Router;
use crate::store::BalanceStore;
use balance_core::{BalanceSample, NetworkGroup, Partner};
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Configuration for the collector.
#[derive(Debug, Clone, Default)]
pub struct CollectorConfig {
    /// Maximum partner fetches in flight per batch. `0` means unbounded.
    pub max_concurrency: usize,
}

/// Result of one partner's unit of work in a persist batch.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Persisted { balance: f64 },
    FetchFailed { error: String },
    PersistFailed { balance: f64, error: String },
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UnitOutcome::Persisted { .. })
    }
}

/// Per-partner outcomes of a persist batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub network: String,
    pub outcomes: BTreeMap<String, UnitOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Fans balance fetches out across a network group.
pub struct Collector {
    router: Arc<Router>,
    store: Arc<dyn BalanceStore>,
    config: CollectorConfig,
}

impl Collector {
    pub fn new(router: Arc<Router>, store: Arc<dyn BalanceStore>, config: CollectorConfig) -> Self {
        Self {
            router,
            store,
            config,
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Run `unit` for every partner of the group and wait for all of them.
    /// Each unit owns its partner so the batch future stays `Send`.
    async fn fan_out<T, F, Fut>(&self, group: &NetworkGroup, unit: F) -> Vec<(String, T)>
    where
        F: Fn(Partner) -> Fut,
        Fut: Future<Output = T> + Send,
        T: Send,
    {
        let limit = match self.config.max_concurrency {
            0 => group.len().max(1),
            n => n,
        };

        let units: Vec<_> = group
            .partners()
            .iter()
            .cloned()
            .map(|partner| {
                let name = partner.name().to_string();
                let fut = unit(partner);
                async move { (name, fut.await) }
            })
            .collect();

        stream::iter(units).buffer_unordered(limit).collect().await
    }

    /// Live balances for every partner of the group. Partners whose fetch
    /// failed are left out.
    pub async fn collect_group(&self, group: &NetworkGroup) -> BTreeMap<String, f64> {
        let results = self
            .fan_out(group, |partner| {
                let router = Arc::clone(&self.router);
                async move { router.dispatch(&partner).await }
            })
            .await;

        let network = group.name();
        results
            .into_iter()
            .filter_map(|(name, result)| match result {
                Ok(balance) => Some((name, balance)),
                Err(e) => {
                    debug!(network, partner = %name, error = %e, "Skipping partner");
                    None
                }
            })
            .collect()
    }

    /// Fetch and persist one sample per partner.
    ///
    /// Always completes once every unit finished; individual failures are
    /// logged and reported in the returned summary.
    pub async fn collect_and_persist(&self, group: &NetworkGroup) -> BatchSummary {
        let results = self
            .fan_out(group, |partner| {
                let router = Arc::clone(&self.router);
                let store = Arc::clone(&self.store);
                let network = group.name().to_string();
                async move { persist_unit(&router, store.as_ref(), &network, &partner).await }
            })
            .await;

        let network = group.name();
        let summary = BatchSummary {
            network: network.to_string(),
            outcomes: results.into_iter().collect(),
        };
        info!(
            network,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Balance collection finished"
        );
        summary
    }

    /// Persist batch for every group, one group after another.
    pub async fn collect_all(&self, groups: &[NetworkGroup]) -> Vec<BatchSummary> {
        let mut summaries = Vec::with_capacity(groups.len());
        for group in groups {
            summaries.push(self.collect_and_persist(group).await);
        }
        summaries
    }
}

async fn persist_unit(
    router: &Router,
    store: &dyn BalanceStore,
    network: &str,
    partner: &Partner,
) -> UnitOutcome {
    let balance = match router.dispatch(partner).await {
        Ok(balance) => balance,
        Err(e) => {
            error!(network, partner = partner.name(), error = %e, "Balance fetch failed");
            return UnitOutcome::FetchFailed {
                error: e.to_string(),
            };
        }
    };

    let sample = BalanceSample::new(partner.name(), network, balance, Utc::now());
    match store.append_balance(&sample).await {
        Ok(()) => {
            debug!(network, partner = partner.name(), balance = balance, "Balance persisted");
            UnitOutcome::Persisted { balance }
        }
        Err(e) => {
            error!(network, partner = partner.name(), error = %e, "Balance insert failed");
            UnitOutcome::PersistFailed {
                balance,
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryBalanceStore;
    use balance_feeds::MockBalanceAdapter;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn group(names: &[&str]) -> NetworkGroup {
        NetworkGroup::new(
            "adrich",
            names.iter().map(|n| Partner::new(*n, format!("token-{}", n))).collect(),
        )
    }

    async fn registered_store(names: &[&str]) -> Arc<InMemoryBalanceStore> {
        let store = Arc::new(InMemoryBalanceStore::new());
        for name in names {
            store.upsert_partner(name, "adrich", true).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_failed_partner_does_not_block_batch() {
        let router = Router::new()
            .with_adapter("A", Arc::new(MockBalanceAdapter::balance(100.0)))
            .with_adapter("B", Arc::new(MockBalanceAdapter::failing("upstream down")))
            .with_adapter("C", Arc::new(MockBalanceAdapter::balance(50.0)));
        let store = registered_store(&["A", "B", "C"]).await;
        let collector = Collector::new(Arc::new(router), store.clone(), CollectorConfig::default());

        let summary = collector.collect_and_persist(&group(&["A", "B", "C"])).await;

        assert_eq!(store.samples("A", "adrich"), vec![100.0]);
        assert!(store.samples("B", "adrich").is_empty());
        assert_eq!(store.samples("C", "adrich"), vec![50.0]);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert!(matches!(summary.outcomes["B"], UnitOutcome::FetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_unregistered_partner_reports_persist_failure() {
        let router = Router::new()
            .with_adapter("A", Arc::new(MockBalanceAdapter::balance(1.0)))
            .with_adapter("Z", Arc::new(MockBalanceAdapter::balance(2.0)));
        let store = registered_store(&["A"]).await;
        let collector = Collector::new(Arc::new(router), store.clone(), CollectorConfig::default());

        let summary = collector.collect_and_persist(&group(&["A", "Z"])).await;

        assert_eq!(summary.outcomes["A"], UnitOutcome::Persisted { balance: 1.0 });
        assert!(matches!(
            summary.outcomes["Z"],
            UnitOutcome::PersistFailed { balance, .. } if balance == 2.0
        ));
    }

    #[tokio::test]
    async fn test_unknown_partner_is_isolated() {
        let router = Router::new().with_adapter("A", Arc::new(MockBalanceAdapter::balance(3.0)));
        let store = registered_store(&["A", "Ghost"]).await;
        let collector = Collector::new(Arc::new(router), store.clone(), CollectorConfig::default());

        let summary = collector.collect_and_persist(&group(&["A", "Ghost"])).await;

        assert_eq!(store.samples("A", "adrich"), vec![3.0]);
        assert!(matches!(summary.outcomes["Ghost"], UnitOutcome::FetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_collect_group_omits_failures() {
        let router = Router::new()
            .with_adapter("A", Arc::new(MockBalanceAdapter::balance(100.0)))
            .with_adapter("B", Arc::new(MockBalanceAdapter::failing("boom")));
        let store = Arc::new(InMemoryBalanceStore::new());
        let collector = Collector::new(Arc::new(router), store.clone(), CollectorConfig::default());

        let balances = collector.collect_group(&group(&["A", "B"])).await;

        let expected: BTreeMap<String, f64> = [("A".to_string(), 100.0)].into_iter().collect();
        assert_eq!(balances, expected);
        assert!(store.samples("A", "adrich").is_empty());
    }

    #[tokio::test]
    async fn test_unbounded_runs_all_partners_concurrently() {
        let adapter = Arc::new(MockBalanceAdapter::balance(1.0).with_delay(Duration::from_millis(50)));
        let names = ["A", "B", "C", "D", "E"];
        let mut router = Router::new();
        for name in names {
            router.register(name, adapter.clone());
        }
        let collector = Collector::new(
            Arc::new(router),
            Arc::new(InMemoryBalanceStore::new()),
            CollectorConfig::default(),
        );

        let balances = collector.collect_group(&group(&names)).await;

        assert_eq!(balances.len(), 5);
        assert_eq!(adapter.peak_in_flight(), 5);
    }

    #[tokio::test]
    async fn test_bounded_concurrency() {
        let adapter = Arc::new(MockBalanceAdapter::balance(1.0).with_delay(Duration::from_millis(20)));
        let names = ["A", "B", "C", "D", "E", "F"];
        let mut router = Router::new();
        for name in names {
            router.register(name, adapter.clone());
        }
        let store = registered_store(&names).await;
        let collector = Collector::new(
            Arc::new(router),
            store.clone(),
            CollectorConfig { max_concurrency: 2 },
        );

        let summary = collector.collect_and_persist(&group(&names)).await;

        assert_eq!(summary.succeeded(), 6);
        assert_eq!(adapter.calls(), 6);
        assert!(adapter.peak_in_flight() <= 2);
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_batch_futures_are_send() {
        let store = Arc::new(InMemoryBalanceStore::new());
        let collector = Collector::new(Arc::new(Router::new()), store, CollectorConfig::default());
        let group = group(&["A", "B"]);

        assert_send(collector.collect_group(&group));
        assert_send(collector.collect_and_persist(&group));
        assert_send(collector.collect_all(std::slice::from_ref(&group)));
    }

    #[tokio::test]
    async fn test_empty_group() {
        let collector = Collector::new(
            Arc::new(Router::new()),
            Arc::new(InMemoryBalanceStore::new()),
            CollectorConfig::default(),
        );
        let empty = NetworkGroup::new("adrich", Vec::new());
        let summary = collector.collect_and_persist(&empty).await;
        assert!(summary.outcomes.is_empty());
        assert!(collector.collect_group(&empty).await.is_empty());
    }
}
