//! Error types for configuration and settings persistence.
//!
//! This module defines all errors that can occur while loading `shell.toml`
//! or reading/writing the persisted settings blob.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and settings I/O.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a configuration file to disk.
    #[error("Failed to write config file at {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML file at {path}: {source}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to parse or encode the JSON settings blob.
    #[error("Invalid JSON settings at {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The settings file is valid JSON but not an object.
    #[error("Settings at {path} must be a JSON object")]
    NotAnObject { path: PathBuf },

    /// An environment override has a value that cannot be used.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },

    /// Invalid configuration values.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Type alias for Result with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;
