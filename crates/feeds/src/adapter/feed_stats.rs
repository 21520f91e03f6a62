//! Feed statistics API that reports the balance as a string.
//!
//! Response: `{"data": {"balance": "22.22"}}`. The token travels as a query
//! parameter and the report is requested for the current day.

use super::BalanceAdapter;
use crate::error::FetchError;
use crate::rest::{fetch_body, parse_balance_str};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct FeedStatsResponse {
    pub data: FeedStatsData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedStatsData {
    pub balance: String,
}

pub struct FeedStatsAdapter {
    client: reqwest::Client,
    base_url: String,
    feed_id: String,
}

impl FeedStatsAdapter {
    const BASE_URL: &'static str = "https://example.com";
    const PATH: &'static str = "/api/v1/";
    const DEFAULT_FEED_ID: &'static str = "11111";

    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Self::BASE_URL.to_string(),
            feed_id: Self::DEFAULT_FEED_ID.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_feed_id(mut self, feed_id: impl Into<String>) -> Self {
        self.feed_id = feed_id.into();
        self
    }

    fn url(&self, token: &str, day: NaiveDate) -> Result<Url, FetchError> {
        let day = day.format("%Y-%m-%d").to_string();
        let url = Url::parse_with_params(
            &format!("{}{}", self.base_url, Self::PATH),
            &[
                ("api_token", token),
                ("start_date", day.as_str()),
                ("end_date", day.as_str()),
                ("group_by", "feed"),
                ("feed_ids", self.feed_id.as_str()),
            ],
        )?;
        Ok(url)
    }

    pub fn parse_balance(body: &str) -> Result<f64, FetchError> {
        let response: FeedStatsResponse = serde_json::from_str(body)?;
        parse_balance_str(&response.data.balance)
    }
}

impl Default for FeedStatsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceAdapter for FeedStatsAdapter {
    fn kind(&self) -> &'static str {
        "feed_stats"
    }

    async fn fetch_balance(&self, token: &str) -> Result<f64, FetchError> {
        let today = chrono::Local::now().date_naive();
        let url = self.url(token, today)?;
        let body = fetch_body(self.client.get(url)).await?;
        Self::parse_balance(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_balance() {
        let body = r#"{"data": {"balance": "22.22"}}"#;
        assert_eq!(FeedStatsAdapter::parse_balance(body).unwrap(), 22.22);
    }

    #[test]
    fn test_parse_non_numeric_balance() {
        let body = r#"{"data": {"balance": "n/a"}}"#;
        let err = FeedStatsAdapter::parse_balance(body).unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn test_parse_missing_data() {
        let err = FeedStatsAdapter::parse_balance(r#"{"status": "ok"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_url_query() {
        let adapter = FeedStatsAdapter::new()
            .with_base_url("http://localhost:9000")
            .with_feed_id("42");
        let day = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let url = adapter.url("tok&en", day).unwrap();

        assert_eq!(url.path(), "/api/v1/");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("api_token".to_string(), "tok&en".to_string())));
        assert!(query.contains(&("start_date".to_string(), "2025-03-31".to_string())));
        assert!(query.contains(&("end_date".to_string(), "2025-03-31".to_string())));
        assert!(query.contains(&("feed_ids".to_string(), "42".to_string())));
    }
}
