//! Logging setup.
//!
//! Two outputs:
//! - compact, human-readable lines on stderr
//! - JSON lines in a daily-rolling file under `<data_dir>/aparetext/logs`
//!
//! `RUST_LOG` takes precedence over the level passed to [`init`]. If the log
//! directory cannot be created, only stderr is used.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "aparetext-shell.jsonl";

/// Keeps the file writer alive. Dropping it flushes pending log lines.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Directory holding the JSON log files, if file logging is active.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Default log directory.
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("aparetext").join("logs"))
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("{level},hyper=warn,hyper_util=warn,reqwest=warn")
}

/// Install the global subscriber. Keep the returned guard alive.
///
/// Calling this twice is harmless; the second subscriber is not installed.
pub fn init(level: &str, log_dir: Option<PathBuf>) -> LoggingGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let log_dir = log_dir.and_then(|dir| match std::fs::create_dir_all(&dir) {
        Ok(()) => Some(dir),
        Err(e) => {
            eprintln!("failed to create log directory {}: {e}", dir.display());
            None
        }
    });

    let (file_layer, file_guard) = match &log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if installed.is_ok() {
        tracing::debug!(log_dir = ?log_dir, "logging initialized");
    }

    LoggingGuard {
        _file_guard: file_guard,
        log_dir,
    }
}
