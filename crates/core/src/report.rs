//! Report rendering.
//!
//! A report is a timestamp header followed by one `<b>partner</b>: value`
//! line per entry, alphabetically by partner. The text is HTML-formatted for
//! chat delivery.

use crate::round_to;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Header timestamp format: `DD-MM-YYYY / HH:MM`.
pub const REPORT_TIME_FORMAT: &str = "%d-%m-%Y / %H:%M";

/// Marker appended to low-balance lines.
pub const LOW_BALANCE_MARKER: &str = "⚠️";

/// Balance classification against the alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStatus {
    Normal,
    Low,
}

impl BalanceStatus {
    #[inline]
    pub fn is_low(self) -> bool {
        matches!(self, BalanceStatus::Low)
    }
}

/// Per-network report, rendered once and then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertReport {
    network: String,
    generated_at: NaiveDateTime,
    entries: BTreeMap<String, String>,
}

/// The plain balance listing shares the report envelope.
pub type BalanceListing = AlertReport;

impl AlertReport {
    pub fn new(network: impl Into<String>, generated_at: NaiveDateTime) -> Self {
        Self {
            network: network.into(),
            generated_at,
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, partner: impl Into<String>, line: String) {
        self.entries.insert(partner.into(), line);
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn generated_at(&self) -> NaiveDateTime {
        self.generated_at
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render to text. An empty report renders to an empty string, which
    /// callers treat as "nothing to send".
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }

        let mut out = self.generated_at.format(REPORT_TIME_FORMAT).to_string();
        out.push('\n');
        for (partner, line) in &self.entries {
            out.push_str(&format!("<b>{}</b>: {}\n\n", escape_html(partner), line));
        }
        out
    }
}

/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// `"{balance} (spend {estimate})"`, with the low marker when needed.
pub fn format_alert_line(balance: f64, estimate: f64, status: BalanceStatus) -> String {
    let line = format!(
        "{:.2} (spend {:.2})",
        round_to(balance, 2),
        round_to(estimate, 2)
    );
    match status {
        BalanceStatus::Low => format!("{} {}", line, LOW_BALANCE_MARKER),
        BalanceStatus::Normal => line,
    }
}

pub fn format_balance_line(balance: f64) -> String {
    format!("{:.2}", round_to(balance, 2))
}
