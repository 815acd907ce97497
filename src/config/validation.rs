//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use crate::model::Command;
use std::collections::HashSet;
use tandem_proto::{ProtocolError, ReplicaId};
use thiserror::Error;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("hub.id is invalid: {0}")]
    InvalidHubId(ProtocolError),
    #[error("hub.topic is invalid: {0}")]
    InvalidTopic(ProtocolError),
    #[error("hub endpoints must be distinct, {0} is used twice")]
    DuplicateEndpoint(std::net::SocketAddr),
    #[error("session.local_only names an unknown command: {0}")]
    UnknownLocalOnlyCommand(String),
    #[error("session.snapshot_timeout_ms must be greater than zero")]
    ZeroSnapshotTimeout,
    #[error("log.level must be one of trace, debug, info, warn, error, off; got '{0}'")]
    InvalidLogLevel(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = ReplicaId::new(config.hub.id.as_str()) {
        errors.push(ValidationError::InvalidHubId(e));
    }
    if let Err(e) = tandem_proto::validate_topic(&config.hub.topic) {
        errors.push(ValidationError::InvalidTopic(e));
    }

    // Port 0 asks the OS for a free port, so only fixed ports can collide.
    let mut seen = HashSet::new();
    for addr in [config.hub.publish, config.hub.subscribe, config.hub.snapshot] {
        if addr.port() != 0 && !seen.insert(addr) {
            errors.push(ValidationError::DuplicateEndpoint(addr));
        }
    }

    for keyword in &config.session.local_only {
        let upper = keyword.to_ascii_uppercase();
        if !Command::KEYWORDS.contains(&upper.as_str()) {
            errors.push(ValidationError::UnknownLocalOnlyCommand(keyword.clone()));
        }
    }
    if config.session.snapshot_timeout_ms == 0 {
        errors.push(ValidationError::ZeroSnapshotTimeout);
    }

    let level = config.log.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(config.log.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
