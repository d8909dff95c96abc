//! Configuration management for the lead engagement orchestrator
//!
//! Supports loading configuration from:
//! - YAML/TOML files
//! - Environment variables (LEADFLOW_ prefix, `__` separator)
//! - Built-in defaults
//!
//! All settings are read once at startup and validated. Validation failures
//! are fatal: the process exits with code 1 before accepting traffic.

pub mod settings;

pub use settings::{
    load_settings, ComplianceConfig, CrmConfig, DeadlineConfig, HandoffConfig, LlmConfig,
    ObservabilityConfig, ScoringConfig, ServerConfig, SessionConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
