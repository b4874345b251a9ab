//! Persisted user settings.
//!
//! The settings file is an opaque JSON object owned by the UI layer
//! (window positions, hotkey, enabled flag...). It is read and written
//! wholesale; the shell core never interprets individual keys.

use crate::config::error::{ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// JSON key-value blob stored under the platform user-data directory.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<config_dir>/aparetext/config.json`.
    pub fn in_user_data_dir() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("aparetext").join("config.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole settings object. A missing file is an empty object.
    pub fn load(&self) -> ConfigResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::FileRead {
            path: self.path.clone(),
            source,
        })?;

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(ConfigError::NotAnObject {
                path: self.path.clone(),
            }),
            Err(source) => Err(ConfigError::Json {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Replace the whole settings object on disk.
    pub fn save(&self, settings: &Map<String, Value>) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(settings).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;

        std::fs::write(&self.path, content).map_err(|source| ConfigError::FileWrite {
            path: self.path.clone(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> ConfigResult<Option<Value>> {
        Ok(self.load()?.remove(key))
    }

    /// Read-modify-write of a single key.
    pub fn set(&self, key: &str, value: Value) -> ConfigResult<()> {
        let mut settings = self.load()?;
        settings.insert(key.to_string(), value);
        self.save(&settings)
    }
}
