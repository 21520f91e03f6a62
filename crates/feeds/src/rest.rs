//! Shared REST plumbing for partner balance APIs.

use crate::error::FetchError;
use std::time::Duration;
use tracing::debug;

/// Upper bound for a single balance request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept for diagnostics.
const MAX_ERROR_BODY: usize = 512;

/// Send a request with the standard timeout and return the response body.
///
/// Any non-2xx status becomes [`FetchError::Status`] carrying the (truncated)
/// body so the failure can be diagnosed from logs.
pub async fn fetch_body(request: reqwest::RequestBuilder) -> Result<String, FetchError> {
    let response = request.timeout(REQUEST_TIMEOUT).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        debug!(status = status.as_u16(), "Balance API returned non-success status");
        return Err(FetchError::Status {
            status: status.as_u16(),
            body: truncate_body(body),
        });
    }

    Ok(body)
}

/// Interpret a JSON value as a balance: numbers as-is, numeric strings parsed.
pub fn value_as_balance(value: &serde_json::Value) -> Result<f64, FetchError> {
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FetchError::Parse(format!("not a finite number: {}", n)))
            .and_then(finite),
        serde_json::Value::String(s) => parse_balance_str(s),
        other => Err(FetchError::Parse(format!("unexpected balance value: {}", other))),
    }
}

/// Parse a string-encoded balance. `NaN` and infinities are rejected.
pub fn parse_balance_str(raw: &str) -> Result<f64, FetchError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| FetchError::Parse(format!("{:?}: {}", raw, e)))
        .and_then(finite)
}

fn finite(value: f64) -> Result<f64, FetchError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FetchError::Parse(format!("not a finite number: {}", value)))
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }
    body
}
