//! Application configuration.

use balance_engine::{CollectorConfig, ServiceConfig};
use balance_feeds::{AdapterKind, AdapterSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Job schedules.
    pub schedule: ScheduleSettings,
    /// Collector settings.
    pub collector: CollectorSettings,
    /// History window for spend estimation, in days.
    pub lookback_days: u32,
    /// Balance retention, in days.
    pub retention_days: u32,
    /// Adapter wiring per partner name.
    pub adapters: BTreeMap<String, AdapterSettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let adapters = [
            ("Partner1", AdapterKind::Item),
            ("Partner2", AdapterKind::Finance),
            ("Partner3", AdapterKind::FeedStats),
        ]
        .into_iter()
        .map(|(name, kind)| (name.to_string(), AdapterSettings::new(kind)))
        .collect();

        Self {
            schedule: ScheduleSettings::default(),
            collector: CollectorSettings::default(),
            lookback_days: 3,
            retention_days: 7,
            adapters,
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, AppConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from `path`, or defaults if the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, AppConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            lookback_days: self.lookback_days,
            retention_days: self.retention_days,
        }
    }
}

/// Local times of day (`HH:MM`) at which each job fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub collect_at: Vec<String>,
    pub report_at: Vec<String>,
    pub purge_at: Vec<String>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        let times = |list: &[&str]| list.iter().map(|t| t.to_string()).collect();
        Self {
            collect_at: times(&["04:00", "10:00", "16:00", "22:00"]),
            report_at: times(&["10:15", "17:15"]),
            purge_at: times(&["00:00"]),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    /// Concurrent partner fetches per batch, `0` for unbounded.
    pub max_concurrency: usize,
}

impl From<&CollectorSettings> for CollectorConfig {
    fn from(settings: &CollectorSettings) -> Self {
        CollectorConfig {
            max_concurrency: settings.max_concurrency,
        }
    }
}
