//! Event sinks.
//!
//! A sink is anything that can show a shell event to the user: the loading
//! splash, the main (manager) window, or an OS-level alert.

use at_protocol::event_models::Severity;
use at_protocol::ipc::ShellEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// The kind of surface a sink represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// Loading splash; receptive only while startup is in progress.
    Loading,

    /// Main window; receptive once bootstrapping has finished.
    Main,

    /// Platform-level alert; always receptive, notifications only.
    Platform,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The surface behind this sink has been torn down.
    #[error("sink closed")]
    Closed,
}

/// A destination for shell events.
pub trait EventSink: Send + Sync {
    fn kind(&self) -> SinkKind;

    /// Deliver one event. Must not block.
    fn deliver(&self, event: &ShellEvent) -> Result<(), SinkError>;
}

/// Sink adapter backed by an unbounded tokio channel.
///
/// The receiving end belongs to the surface; dropping it tears the sink
/// down. Delivery order on the channel is emission order.
pub struct ChannelSink {
    kind: SinkKind,
    tx: mpsc::UnboundedSender<ShellEvent>,
}

impl ChannelSink {
    pub fn new(kind: SinkKind) -> (Self, mpsc::UnboundedReceiver<ShellEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { kind, tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn deliver(&self, event: &ShellEvent) -> Result<(), SinkError> {
        self.tx.send(event.clone()).map_err(|_| SinkError::Closed)
    }
}

/// Platform sink that writes notifications to the log.
///
/// Used where no native notification center is available (headless runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Platform
    }

    fn deliver(&self, event: &ShellEvent) -> Result<(), SinkError> {
        if let ShellEvent::Notification(notification) = event {
            match notification.severity {
                Severity::Error => tracing::error!(
                    title = %notification.title,
                    "{}",
                    notification.body
                ),
                Severity::Info | Severity::Success => tracing::info!(
                    title = %notification.title,
                    "{}",
                    notification.body
                ),
            }
        }
        Ok(())
    }
}
