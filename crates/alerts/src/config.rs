//! Chat thread configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThreadsConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid threads config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A Telegram chat topic bound to one network group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
    pub network: String,
    #[serde(default)]
    pub description: String,
    pub chat_id: i64,
    /// Forum topic id. `0` posts to the chat itself.
    #[serde(default)]
    pub thread_id: i32,
}

/// Every chat thread the bot serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadsConfig {
    #[serde(default)]
    pub threads: Vec<ChatThread>,
}

impl ThreadsConfig {
    pub fn from_json(json: &str) -> Result<Self, ThreadsConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ThreadsConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ThreadsConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// First thread bound to the chat.
    pub fn find_by_chat(&self, chat_id: i64) -> Option<&ChatThread> {
        self.threads.iter().find(|t| t.chat_id == chat_id)
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}
