//! Core-to-UI communication protocol.
//!
//! The shell core produces [`ShellEvent`]s and the notification router fans
//! them out to UI surfaces. Surfaces backed by a renderer receive the
//! [`UiMessage`] wire form, whose channel names match what the renderer
//! listens on:
//!
//! ```json
//! { "channel": "loading-update", "payload": { "message": "Starting backend...", "progress": 10 } }
//! { "channel": "loading-log", "payload": { "line": "[INFO] Uvicorn running" } }
//! { "channel": "show-notification", "payload": { "title": "...", "body": "...", "type": "error", "timestamp": 1700000000000 } }
//! { "channel": "trigger-new-snippet" }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::event_models::{NotificationEvent, OutputLine, ProgressEvent, Severity};

/// Events emitted by the shell core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum ShellEvent {
    /// Startup progress for the loading surface.
    Progress(ProgressEvent),

    /// A line of worker output.
    Output(OutputLine),

    /// A user-facing outcome.
    Notification(NotificationEvent),

    /// Ask the manager surface to open its "new snippet" form.
    TriggerNewSnippet,
}

impl ShellEvent {
    pub fn is_notification(&self) -> bool {
        matches!(self, ShellEvent::Notification(_))
    }
}

impl From<ProgressEvent> for ShellEvent {
    fn from(event: ProgressEvent) -> Self {
        ShellEvent::Progress(event)
    }
}

impl From<OutputLine> for ShellEvent {
    fn from(line: OutputLine) -> Self {
        ShellEvent::Output(line)
    }
}

impl From<NotificationEvent> for ShellEvent {
    fn from(event: NotificationEvent) -> Self {
        ShellEvent::Notification(event)
    }
}

/// Messages pushed to renderer-backed surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum UiMessage {
    /// Update the loading splash text and progress bar.
    LoadingUpdate { message: String, progress: u8 },

    /// Append a line to the loading splash log pane.
    LoadingLog { line: String },

    /// Show a toast in the receiving window.
    ShowNotification {
        title: String,
        body: String,
        #[serde(rename = "type")]
        kind: Severity,
        /// Milliseconds since the Unix epoch.
        #[ts(type = "number")]
        timestamp: i64,
    },

    /// Open the "new snippet" form.
    TriggerNewSnippet,
}

impl From<&ShellEvent> for UiMessage {
    fn from(event: &ShellEvent) -> Self {
        match event {
            ShellEvent::Progress(progress) => UiMessage::LoadingUpdate {
                message: progress.message.clone(),
                progress: progress.percent,
            },
            ShellEvent::Output(line) => UiMessage::LoadingLog {
                line: line.tagged(),
            },
            ShellEvent::Notification(notification) => UiMessage::ShowNotification {
                title: notification.title.clone(),
                body: notification.body.clone(),
                kind: notification.severity,
                timestamp: notification.timestamp.timestamp_millis(),
            },
            ShellEvent::TriggerNewSnippet => UiMessage::TriggerNewSnippet,
        }
    }
}
