//! Configuration loading and settings persistence.
//!
//! This module provides functionality to load `shell.toml` (with environment
//! overrides) and to read/write the UI's persisted settings blob.

pub mod error;
pub mod loader;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config_path, load_config};
pub use settings::SettingsStore;
