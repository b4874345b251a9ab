//! Helpers for inspecting captured shell events.

use at_protocol::event_models::{NotificationEvent, ProgressEvent, Severity};
use at_protocol::ipc::ShellEvent;

/// Progress events, in order.
#[allow(dead_code)]
pub fn progress(events: &[ShellEvent]) -> Vec<&ProgressEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            ShellEvent::Progress(progress) => Some(progress),
            _ => None,
        })
        .collect()
}

/// Percent values of the progress events, in order.
#[allow(dead_code)]
pub fn percents(events: &[ShellEvent]) -> Vec<u8> {
    progress(events).iter().map(|p| p.percent).collect()
}

/// Notification events, in order.
#[allow(dead_code)]
pub fn notifications(events: &[ShellEvent]) -> Vec<&NotificationEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            ShellEvent::Notification(notification) => Some(notification),
            _ => None,
        })
        .collect()
}

/// Assert there is exactly one notification, of severity error, and return it.
#[allow(dead_code)]
pub fn assert_single_error(events: &[ShellEvent]) -> &NotificationEvent {
    let found = notifications(events);
    assert_eq!(found.len(), 1, "expected exactly one notification, got: {found:?}");
    assert_eq!(found[0].severity, Severity::Error, "notification is not an error: {:?}", found[0]);
    found[0]
}

/// Assert `values` never decreases.
#[allow(dead_code)]
pub fn assert_non_decreasing(values: &[u8]) {
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1], "progress went backwards: {values:?}");
    }
}
