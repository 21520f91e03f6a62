//! Partner balance adapters.
//!
//! Every partner API answers with its own JSON shape. Adapters normalize
//! these into a single `f64` balance so the rest of the system can treat
//! "get a partner's balance" as one capability.

mod feed_stats;
mod finance;
mod item;
mod mock;

pub use feed_stats::{FeedStatsAdapter, FeedStatsResponse};
pub use finance::{FinanceBalanceAdapter, FinanceBalanceResponse};
pub use item::ItemBalanceAdapter;
pub use mock::MockBalanceAdapter;

use crate::error::FetchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trait for partner balance APIs.
#[async_trait]
pub trait BalanceAdapter: Send + Sync {
    /// Short identifier of the upstream API shape, used in logs.
    fn kind(&self) -> &'static str;

    /// Fetch the current balance using the partner's credential.
    async fn fetch_balance(&self, token: &str) -> Result<f64, FetchError>;
}

/// Supported upstream API shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// Flat numeric `item` field.
    Item,
    /// Nested balance object, `balanceCommon` is used.
    Finance,
    /// Feed statistics with a string-encoded balance.
    FeedStats,
}

/// Adapter wiring for one partner, as written in the application config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterSettings {
    pub kind: AdapterKind,
    /// Overrides the adapter's default base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Feed id for [`AdapterKind::FeedStats`].
    #[serde(default)]
    pub feed_id: Option<String>,
}

impl AdapterSettings {
    pub fn new(kind: AdapterKind) -> Self {
        Self {
            kind,
            base_url: None,
            feed_id: None,
        }
    }

    pub fn build(&self) -> Arc<dyn BalanceAdapter> {
        match self.kind {
            AdapterKind::Item => {
                let adapter = ItemBalanceAdapter::new();
                Arc::new(match &self.base_url {
                    Some(url) => adapter.with_base_url(url),
                    None => adapter,
                })
            }
            AdapterKind::Finance => {
                let adapter = FinanceBalanceAdapter::new();
                Arc::new(match &self.base_url {
                    Some(url) => adapter.with_base_url(url),
                    None => adapter,
                })
            }
            AdapterKind::FeedStats => {
                let mut adapter = FeedStatsAdapter::new();
                if let Some(url) = &self.base_url {
                    adapter = adapter.with_base_url(url);
                }
                if let Some(feed_id) = &self.feed_id {
                    adapter = adapter.with_feed_id(feed_id);
                }
                Arc::new(adapter)
            }
        }
    }
}
