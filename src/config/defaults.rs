//! Default value functions for configuration.

use std::net::SocketAddr;

// =============================================================================
// Hub Defaults
// =============================================================================

pub fn default_hub_id() -> String {
    "hub".to_string()
}

pub fn default_topic() -> String {
    tandem_proto::DEFAULT_TOPIC.to_string()
}

pub fn default_publish_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5566))
}

pub fn default_subscribe_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5567))
}

pub fn default_snapshot_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5568))
}

// =============================================================================
// Session Defaults
// =============================================================================

pub fn default_local_only() -> Vec<String> {
    vec!["READ".to_string(), "OBJECTS".to_string()]
}

pub fn default_snapshot_timeout_ms() -> u64 {
    2000
}

// =============================================================================
// Log Defaults
// =============================================================================

pub fn default_log_level() -> String {
    "info".to_string()
}
