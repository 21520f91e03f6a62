//! Partner balance router.
//!
//! Maps a partner name to the adapter that knows how to read its balance.
//! Adapters are registered at startup; unknown partners fail closed.

use balance_core::Partner;
use balance_feeds::{BalanceAdapter, FetchError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("No adapter registered for partner {0}")]
    UnknownPartner(String),
    #[error("Failed to fetch balance for partner {partner}: {source}")]
    Fetch {
        partner: String,
        #[source]
        source: FetchError,
    },
}

impl RouterError {
    pub fn partner(&self) -> &str {
        match self {
            RouterError::UnknownPartner(partner) => partner,
            RouterError::Fetch { partner, .. } => partner,
        }
    }
}

/// Registry of partner adapters.
#[derive(Default, Clone)]
pub struct Router {
    adapters: HashMap<String, Arc<dyn BalanceAdapter>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the adapter for a partner, replacing any previous one.
    pub fn register(&mut self, partner: impl Into<String>, adapter: Arc<dyn BalanceAdapter>) {
        self.adapters.insert(partner.into(), adapter);
    }

    pub fn with_adapter(mut self, partner: impl Into<String>, adapter: Arc<dyn BalanceAdapter>) -> Self {
        self.register(partner, adapter);
        self
    }

    pub fn is_registered(&self, partner: &str) -> bool {
        self.adapters.contains_key(partner)
    }

    /// Registered partner names, sorted.
    pub fn partners(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }

    /// Fetch a live balance for the partner. No caching and no retries.
    pub async fn dispatch(&self, partner: &Partner) -> Result<f64, RouterError> {
        let adapter = self.adapters.get(partner.name()).ok_or_else(|| {
            error!(partner = partner.name(), "Unknown partner, no adapter registered");
            RouterError::UnknownPartner(partner.name().to_string())
        })?;

        match adapter.fetch_balance(partner.token()).await {
            Ok(balance) => {
                debug!(
                    partner = partner.name(),
                    adapter = adapter.kind(),
                    balance = balance,
                    "Fetched balance"
                );
                Ok(balance)
            }
            Err(e) => {
                error!(
                    partner = partner.name(),
                    adapter = adapter.kind(),
                    transient = e.is_transient(),
                    error = %e,
                    "Failed to fetch balance"
                );
                Err(RouterError::Fetch {
                    partner: partner.name().to_string(),
                    source: e,
                })
            }
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("partners", &self.partners())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balance_feeds::MockBalanceAdapter;

    #[tokio::test]
    async fn test_dispatch_returns_adapter_balance() {
        let router = Router::new().with_adapter("Partner1", Arc::new(MockBalanceAdapter::balance(120.03)));
        let balance = router.dispatch(&Partner::new("Partner1", "t")).await.unwrap();
        assert_eq!(balance, 120.03);
    }

    #[tokio::test]
    async fn test_unknown_partner_fails_closed() {
        let router = Router::new().with_adapter("Partner1", Arc::new(MockBalanceAdapter::balance(1.0)));
        let err = router.dispatch(&Partner::new("Nobody", "t")).await.unwrap_err();
        assert!(matches!(err, RouterError::UnknownPartner(ref name) if name == "Nobody"));
        assert_eq!(err.partner(), "Nobody");
    }

    #[tokio::test]
    async fn test_fetch_error_carries_partner() {
        let router = Router::new().with_adapter("Partner2", Arc::new(MockBalanceAdapter::failing("timeout")));
        let err = router.dispatch(&Partner::new("Partner2", "t")).await.unwrap_err();
        assert!(matches!(err, RouterError::Fetch { .. }));
        let msg = err.to_string();
        assert!(msg.contains("Partner2"));
        assert!(msg.contains("timeout"));
    }

    #[tokio::test]
    async fn test_no_caching_between_calls() {
        let adapter = Arc::new(MockBalanceAdapter::balance(5.0));
        let router = Router::new().with_adapter("Partner1", adapter.clone());
        let partner = Partner::new("Partner1", "t");

        router.dispatch(&partner).await.unwrap();
        router.dispatch(&partner).await.unwrap();
        assert_eq!(adapter.calls(), 2);
    }

    #[test]
    fn test_registered_partners_sorted() {
        let router = Router::new()
            .with_adapter("B", Arc::new(MockBalanceAdapter::balance(1.0)))
            .with_adapter("A", Arc::new(MockBalanceAdapter::balance(1.0)));
        assert_eq!(router.partners(), vec!["A", "B"]);
        assert!(router.is_registered("A"));
        assert!(!router.is_registered("C"));
    }
}
