//! Notification routing.
//!
//! This module provides:
//! - The `EventSink` abstraction for UI surfaces and platform alerts
//! - `NotificationRouter`, which fans shell events out to receptive sinks

pub mod router;
pub mod sink;

pub use router::{NotificationRouter, RouterStage, SinkId};
pub use sink::{ChannelSink, EventSink, SinkError, SinkKind, TracingSink};
