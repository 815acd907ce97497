//! Configuration loading and management.
//!
//! - [`types`]: config structs and file loading
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
mod validation;

pub use types::{
    Config, ConfigError, HubConfig, LogConfig, LogFormat, ReplicaConfig, SessionConfig,
};
pub use validation::{validate, ValidationError};
