//! Shell configuration loader.
//!
//! Configuration is resolved in three layers:
//! 1. `shell.toml` (every field optional, see [`ShellConfig`])
//! 2. Environment overrides (`APARETEXT_MODE`, `APARETEXT_BACKEND_URL`,
//!    `APARETEXT_PROBE_TRANSPORT`)
//! 3. Validation and normalization

use crate::config::error::{ConfigError, ConfigResult};
use at_protocol::config_models::{LaunchMode, ProbeTransport, ShellConfig};
use std::path::{Path, PathBuf};

pub const MODE_ENV: &str = "APARETEXT_MODE";
pub const BACKEND_URL_ENV: &str = "APARETEXT_BACKEND_URL";
pub const PROBE_TRANSPORT_ENV: &str = "APARETEXT_PROBE_TRANSPORT";

/// Default location of `shell.toml` under the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aparetext").join("shell.toml"))
}

/// Loads the shell configuration.
///
/// # Arguments
///
/// * `path` - Path to `shell.toml`. A missing file (or `None`) yields the
///   defaults rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, if
/// an environment override holds an unusable value, or if validation fails.
pub fn load_config(path: Option<&Path>) -> ConfigResult<ShellConfig> {
    let mut config = match path {
        Some(path) if path.exists() => read_config_file(path)?,
        Some(path) => {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            ShellConfig::default()
        }
        None => ShellConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&mut config)?;

    Ok(config)
}

fn read_config_file(path: &Path) -> ConfigResult<ShellConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Applies environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut ShellConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(MODE_ENV) {
        config.mode = LaunchMode::parse(&raw).ok_or_else(|| ConfigError::InvalidEnv {
            name: MODE_ENV.to_string(),
            value: raw.clone(),
        })?;
    }

    if let Some(raw) = lookup(BACKEND_URL_ENV) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidEnv {
                name: BACKEND_URL_ENV.to_string(),
                value: raw,
            });
        }
        config.backend.url = trimmed.to_string();
    }

    if let Some(raw) = lookup(PROBE_TRANSPORT_ENV) {
        config.probe.transport =
            ProbeTransport::parse(&raw).ok_or_else(|| ConfigError::InvalidEnv {
                name: PROBE_TRANSPORT_ENV.to_string(),
                value: raw.clone(),
            })?;
    }

    Ok(())
}

/// Validates the configuration, normalizing values that have an obvious fix.
pub fn validate_config(config: &mut ShellConfig) -> ConfigResult<()> {
    let url = config.backend.url.trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::InvalidConfig {
            reason: format!("backend.url must be an http(s) URL, got '{}'", config.backend.url),
        });
    }
    config.backend.url = url.to_string();

    let health_path = config.backend.health_path.trim();
    config.backend.health_path = if health_path.is_empty() {
        "/".to_string()
    } else if health_path.starts_with('/') {
        health_path.to_string()
    } else {
        let normalized = format!("/{health_path}");
        tracing::warn!(
            health_path,
            normalized = %normalized,
            "backend.health_path is missing leading '/', normalized"
        );
        normalized
    };

    let probe = &mut config.probe;
    if probe.max_attempts == 0 {
        return Err(ConfigError::InvalidConfig {
            reason: "probe.max_attempts must be at least 1".to_string(),
        });
    }
    if probe.interval_ms == 0 || probe.attempt_timeout_ms == 0 {
        return Err(ConfigError::InvalidConfig {
            reason: "probe.interval_ms and probe.attempt_timeout_ms must be positive".to_string(),
        });
    }

    let end = probe.end_percent.min(100);
    let start = probe.start_percent.min(end);
    if (start, end) != (probe.start_percent, probe.end_percent) {
        tracing::warn!(
            start_percent = probe.start_percent,
            end_percent = probe.end_percent,
            start,
            end,
            "probe progress range normalized"
        );
    }
    probe.start_percent = start;
    probe.end_percent = end;

    Ok(())
}
