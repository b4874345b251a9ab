//! Event values produced by the shell core.
//!
//! None of these are persisted; they live for one application run and are
//! fanned out to UI surfaces by the notification router.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Startup progress shown on the loading surface.
///
/// Immutable once created. `percent` is always within `0..=100`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ProgressEvent {
    pub message: String,
    pub percent: u8,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create a progress event stamped with the current time.
    ///
    /// Values above 100 are clamped.
    pub fn new(message: impl Into<String>, percent: u8) -> Self {
        Self {
            message: message.into(),
            percent: percent.min(100),
            timestamp: Utc::now(),
        }
    }
}

/// Which output stream of the worker a line came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    /// Tag prefixed to forwarded lines.
    pub fn tag(self) -> &'static str {
        match self {
            OutputStream::Stdout => "[INFO]",
            OutputStream::Stderr => "[ERROR]",
        }
    }
}

/// A single decoded line of worker output.
///
/// This is the log-flavored progress event: it carries text for the loading
/// surface's log pane but never moves the progress bar.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
    pub timestamp: DateTime<Utc>,
}

impl OutputLine {
    pub fn new(stream: OutputStream, line: impl Into<String>) -> Self {
        Self {
            stream,
            line: line.into(),
            timestamp: Utc::now(),
        }
    }

    /// The line with its stream tag, e.g. `[ERROR] Traceback ...`.
    pub fn tagged(&self) -> String {
        format!("{} {}", self.stream.tag(), self.line)
    }
}

/// Severity of a user-facing notification.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A user-facing outcome (toast in a window, or a platform alert).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct NotificationEvent {
    pub title: String,
    pub body: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(title: impl Into<String>, body: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body, Severity::Info)
    }

    pub fn success(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body, Severity::Success)
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body, Severity::Error)
    }
}
