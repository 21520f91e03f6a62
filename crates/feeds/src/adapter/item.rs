//! Partner API that reports the balance as a flat `item` field.
//!
//! Response: `{"item": 120.03}`

use super::BalanceAdapter;
use crate::error::FetchError;
use crate::rest::{fetch_body, value_as_balance};
use async_trait::async_trait;

pub struct ItemBalanceAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl ItemBalanceAdapter {
    const BASE_URL: &'static str = "https://example.com";
    const PATH: &'static str = "/advertiser/balance.json";

    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Self::BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url, Self::PATH)
    }

    /// Extract the balance from a response body.
    pub fn parse_balance(body: &str) -> Result<f64, FetchError> {
        let json: serde_json::Value = serde_json::from_str(body)?;
        let item = json
            .get("item")
            .ok_or_else(|| FetchError::Parse("missing \"item\" field".to_string()))?;
        value_as_balance(item)
    }
}

impl Default for ItemBalanceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceAdapter for ItemBalanceAdapter {
    fn kind(&self) -> &'static str {
        "item"
    }

    async fn fetch_balance(&self, token: &str) -> Result<f64, FetchError> {
        let request = self
            .client
            .get(self.url())
            .header("Accept", "application/json")
            .header("x-api-key", token);

        let body = fetch_body(request).await?;
        Self::parse_balance(&body)
    }
}
