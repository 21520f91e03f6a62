//! Partner network configuration.
//!
//! The configuration is a point-in-time snapshot. Callers re-read it through
//! [`NetworksSource`] on every top-level invocation so toggling a partner's
//! `is_active` flag takes effect without a restart.

use crate::{NetworkGroup, Partner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid networks config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Per-partner settings as written in the networks file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerSettings {
    /// Credential passed to the partner adapter.
    pub token: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_active: bool,
}

/// A roster row used to register partners with the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub network: String,
    pub partner: String,
    pub is_active: bool,
}

/// All configured networks: `network -> partner -> settings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworksConfig {
    #[serde(default)]
    pub networks: BTreeMap<String, BTreeMap<String, PartnerSettings>>,
}

impl NetworksConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Groups with at least one active partner, ordered by network name.
    pub fn active_groups(&self) -> Vec<NetworkGroup> {
        self.networks
            .keys()
            .filter_map(|name| self.group(name))
            .collect()
    }

    /// Active roster of a single network, `None` if the network is unknown or
    /// has no active partner.
    pub fn group(&self, network: &str) -> Option<NetworkGroup> {
        let partners: Vec<Partner> = self
            .networks
            .get(network)?
            .iter()
            .filter(|(_, settings)| settings.is_active)
            .map(|(name, settings)| Partner::new(name.as_str(), settings.token.as_str()))
            .collect();

        if partners.is_empty() {
            return None;
        }
        Some(NetworkGroup::new(network, partners))
    }

    /// Every configured network name, active or not.
    pub fn network_names(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }

    /// Every configured partner with its active flag.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.networks
            .iter()
            .flat_map(|(network, partners)| {
                partners.iter().map(move |(partner, settings)| RosterEntry {
                    network: network.clone(),
                    partner: partner.clone(),
                    is_active: settings.is_active,
                })
            })
            .collect()
    }
}

/// Where to read the networks snapshot from.
#[derive(Debug, Clone)]
pub enum NetworksSource {
    /// Re-read the file on every call.
    File(PathBuf),
    /// Fixed snapshot, used by tests and embedded setups.
    Static(NetworksConfig),
}

impl NetworksSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        NetworksSource::File(path.into())
    }

    pub fn snapshot(&self) -> Result<NetworksConfig, ConfigError> {
        match self {
            NetworksSource::File(path) => NetworksConfig::load(path),
            NetworksSource::Static(config) => Ok(config.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "networks": {
            "adrich": {
                "Partner2": { "token": "t2", "description": "second", "is_active": true },
                "Partner1": { "token": "t1", "is_active": true },
                "Partner3": { "token": "t3", "is_active": false }
            },
            "realpush": {
                "Partner1": { "token": "r1", "is_active": false }
            }
        }
    }"#;

    #[test]
    fn test_active_groups_skip_inactive() {
        let config = NetworksConfig::from_json(SAMPLE).unwrap();
        let groups = config.active_groups();

        assert_eq!(groups.len(), 1);
        let names: Vec<&str> = groups[0].partners().iter().map(|p| p.name()).collect();
        assert_eq!(groups[0].name(), "adrich");
        assert_eq!(names, vec!["Partner1", "Partner2"]);
    }

    #[test]
    fn test_group_lookup() {
        let config = NetworksConfig::from_json(SAMPLE).unwrap();
        assert!(config.group("adrich").is_some());
        assert!(config.group("realpush").is_none());
        assert!(config.group("missing").is_none());
    }

    #[test]
    fn test_roster_contains_inactive() {
        let config = NetworksConfig::from_json(SAMPLE).unwrap();
        let roster = config.roster();
        assert_eq!(roster.len(), 4);
        assert!(roster
            .iter()
            .any(|r| r.network == "adrich" && r.partner == "Partner3" && !r.is_active));
        assert_eq!(config.network_names(), vec!["adrich", "realpush"]);
    }

    #[test]
    fn test_invalid_json() {
        let result = NetworksConfig::from_json("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let source = NetworksSource::file("/definitely/not/here.json");
        assert!(matches!(source.snapshot(), Err(ConfigError::Io { .. })));
    }
}
