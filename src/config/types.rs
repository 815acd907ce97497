//! Core configuration types.

use super::defaults::*;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tandem_proto::ReplicaId;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Identity of this replica.
    #[serde(default)]
    pub replica: ReplicaConfig,
    /// Hub endpoints (bound by `tandem hub`, dialed by `tandem client`).
    #[serde(default)]
    pub hub: HubConfig,
    /// Replication session behavior.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Replica identity configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplicaConfig {
    /// Sender id stamped on every published message. Random when absent.
    /// Ids that cannot appear in an envelope are rejected at parse time.
    #[serde(default)]
    pub id: Option<ReplicaId>,
}

impl ReplicaConfig {
    /// The configured id, or a freshly generated one.
    pub fn identity(&self) -> ReplicaId {
        self.id.clone().unwrap_or_else(ReplicaId::generate)
    }
}

/// Hub endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Sender id the hub signs the snapshot sentinel with.
    #[serde(default = "default_hub_id")]
    pub id: String,
    /// Pub/sub topic.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Where replicas push frames.
    #[serde(default = "default_publish_addr")]
    pub publish: SocketAddr,
    /// Where replicas receive frames.
    #[serde(default = "default_subscribe_addr")]
    pub subscribe: SocketAddr,
    /// Where replicas request snapshots.
    #[serde(default = "default_snapshot_addr")]
    pub snapshot: SocketAddr,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            id: default_hub_id(),
            topic: default_topic(),
            publish: default_publish_addr(),
            subscribe: default_subscribe_addr(),
            snapshot: default_snapshot_addr(),
        }
    }
}

/// Replication session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Command keywords applied locally but never published.
    #[serde(default = "default_local_only")]
    pub local_only: Vec<String>,
    /// How long the snapshot stream may stay silent before the join gives up.
    #[serde(default = "default_snapshot_timeout_ms")]
    pub snapshot_timeout_ms: u64,
}

impl SessionConfig {
    #[must_use]
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_only: default_local_only(),
            snapshot_timeout_ms: default_snapshot_timeout_ms(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration. `RUST_LOG` overrides `level` when set.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
