//! Logging setup and standard spans.

use crate::config::{LogConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` when set, otherwise the configured level.
pub fn filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Installs the global subscriber. Call once, at startup.
pub fn init(config: &LogConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config))
        .with_target(true);
    match config.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Standardized span constructors.
pub mod spans {
    use std::net::SocketAddr;
    use tracing::{Span, info_span};

    /// Span for everything a replica does.
    pub fn replica(id: &str) -> Span {
        info_span!("replica", id = %id)
    }

    /// Span for the hub's accept loop.
    pub fn hub(id: &str, topic: &str) -> Span {
        info_span!("hub", id = %id, topic = %topic)
    }

    /// Span for one accepted connection.
    pub fn connection(endpoint: &str, peer: &SocketAddr) -> Span {
        info_span!("connection", endpoint = %endpoint, peer = %peer)
    }
}
