//! Partner API with a nested balance object.
//!
//! Response: `{"balanceCommon": 231.39, "balanceReal": 200.0}`; the common
//! balance is what the partner lets us spend.

use super::BalanceAdapter;
use crate::error::FetchError;
use crate::rest::fetch_body;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FinanceBalanceResponse {
    #[serde(rename = "balanceCommon")]
    pub balance_common: f64,
    #[serde(rename = "balanceReal", default)]
    pub balance_real: f64,
}

pub struct FinanceBalanceAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl FinanceBalanceAdapter {
    const BASE_URL: &'static str = "https://api.example.com";
    const PATH: &'static str = "/v1/public/finance/balance";

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

    pub fn parse_balance(body: &str) -> Result<f64, FetchError> {
        let response: FinanceBalanceResponse = serde_json::from_str(body)?;
        Ok(response.balance_common)
    }
}

impl Default for FinanceBalanceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceAdapter for FinanceBalanceAdapter {
    fn kind(&self) -> &'static str {
        "finance"
    }

    async fn fetch_balance(&self, token: &str) -> Result<f64, FetchError> {
        let request = self
            .client
            .get(format!("{}{}", self.base_url, Self::PATH))
            .header("accept", "*/*")
            .header("X-Example-API-Key", token);

        let body = fetch_body(request).await?;
        Self::parse_balance(&body)
    }
}
