//! Shell configuration models for `shell.toml`.
//!
//! Every field has a documented default so an empty (or missing) file yields
//! a working configuration for a packaged install.
//!
//! # Example
//!
//! ```toml
//! mode = "production"
//!
//! [backend]
//! url = "http://127.0.0.1:46321"
//! health_path = "/"
//!
//! [worker]
//! executable = "aparetext-server"
//! encoding = "utf8"
//!
//! [probe]
//! transport = "http"
//! max_attempts = 30
//! interval_ms = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default port of the snippet backend.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:46321";

/// Whether the shell owns the worker process.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// The worker is started out-of-band (e.g. `python -m server.main`).
    Development,

    /// The shell launches the packaged worker executable.
    #[default]
    Production,
}

impl LaunchMode {
    /// Parse a mode name, case-insensitively. Accepts `dev`/`prod` short forms.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(LaunchMode::Development),
            "production" | "prod" => Some(LaunchMode::Production),
            _ => None,
        }
    }
}

/// Transport used by the readiness probe.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeTransport {
    /// `GET` the backend's health endpoint.
    #[default]
    Http,

    /// Invoke the backend bridge script with the `health` function.
    Bridge,
}

impl ProbeTransport {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "http" => Some(ProbeTransport::Http),
            "bridge" => Some(ProbeTransport::Bridge),
            _ => None,
        }
    }
}

/// Text encoding of the worker's output streams.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    /// UTF-8, invalid sequences replaced with U+FFFD.
    #[default]
    Utf8,

    /// ISO-8859-1, one byte per character.
    Latin1,
}

/// Complete shell configuration.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    pub mode: LaunchMode,
    pub backend: BackendSection,
    pub worker: WorkerSection,
    pub probe: ProbeSection,
    pub startup: StartupSection,
    pub clipboard: ClipboardSection,
}

/// Where the backend listens.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BackendSection {
    /// Base URL of the snippet service. Default: `http://127.0.0.1:46321`.
    pub url: String,

    /// Path polled by the HTTP readiness probe. Default: `/`.
    pub health_path: String,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            health_path: "/".to_string(),
        }
    }
}

/// The packaged worker executable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorkerSection {
    /// Packaged resources directory. When unset, `resources/backend` next to
    /// the running shell executable is used.
    pub resources_dir: Option<PathBuf>,

    /// Executable name, relative to `resources_dir` unless absolute.
    /// Default: `aparetext-server` (plus the platform executable suffix).
    pub executable: PathBuf,

    /// Arguments passed to the worker. Default: none.
    pub args: Vec<String>,

    /// Decoding applied to captured output lines.
    pub encoding: OutputEncoding,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            resources_dir: None,
            executable: PathBuf::from(format!(
                "aparetext-server{}",
                std::env::consts::EXE_SUFFIX
            )),
            args: Vec::new(),
            encoding: OutputEncoding::Utf8,
        }
    }
}

/// Readiness probe parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProbeSection {
    pub transport: ProbeTransport,

    /// Attempt budget. Default: 30.
    pub max_attempts: u32,

    /// Start-to-start spacing of attempts. Default: 1000 ms. When an attempt
    /// takes longer than this, the next one starts a quarter interval after
    /// it ended.
    pub interval_ms: u64,

    /// Per-attempt timeout. Default: 2000 ms.
    pub attempt_timeout_ms: u64,

    /// Progress reported before the first attempt. Default: 30.
    pub start_percent: u8,

    /// Progress reported after the last attempt. Default: 80.
    pub end_percent: u8,

    pub bridge: BridgeSection,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            transport: ProbeTransport::Http,
            max_attempts: 30,
            interval_ms: 1000,
            attempt_timeout_ms: 2000,
            start_percent: 30,
            end_percent: 80,
            bridge: BridgeSection::default(),
        }
    }
}

/// Subprocess bridge used by the `bridge` probe transport.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct BridgeSection {
    /// Interpreter. When unset, `python3` then `python` are looked up on PATH.
    pub interpreter: Option<PathBuf>,

    /// Bridge script, e.g. `electron-app/python_backend.py`.
    pub script: Option<PathBuf>,
}

/// Fixed delays of the startup sequence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StartupSection {
    /// Grace period after launching the worker. Default: 1000 ms.
    pub settle_after_launch_ms: u64,

    /// Grace period when no worker was launched. Default: 500 ms.
    pub settle_without_worker_ms: u64,

    /// How long "ready" stays on screen. Default: 1500 ms.
    pub ready_display_ms: u64,
}

impl Default for StartupSection {
    fn default() -> Self {
        Self {
            settle_after_launch_ms: 1000,
            settle_without_worker_ms: 500,
            ready_display_ms: 1500,
        }
    }
}

/// Clipboard behaviour of snippet expansion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClipboardSection {
    /// Delay before the previous clipboard text is restored. Default: 10000 ms.
    pub restore_after_ms: u64,
}

impl Default for ClipboardSection {
    fn default() -> Self {
        Self {
            restore_after_ms: 10_000,
        }
    }
}
