//! Notification router.
//!
//! The router is the single pass-through point between event producers
//! (supervisor, prober, bootstrapper, shell commands) and UI surfaces. It is
//! a cheap `Clone` handle so background tasks can emit without borrowing the
//! application.

use crate::notify::sink::{EventSink, SinkError, SinkKind};
use at_protocol::ipc::ShellEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Which surfaces are receptive right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouterStage {
    /// The readiness pipeline is running; the loading surface is up.
    #[default]
    Startup,

    /// Bootstrapping finished; the main surface is up.
    Running,
}

/// Identifier returned by [`NotificationRouter::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

struct Registered {
    id: SinkId,
    sink: Arc<dyn EventSink>,
}

#[derive(Default)]
struct RouterState {
    stage: RouterStage,
    sinks: Vec<Registered>,
}

/// Fans shell events out to every registered, receptive sink.
#[derive(Clone, Default)]
pub struct NotificationRouter {
    state: Arc<Mutex<RouterState>>,
    next_id: Arc<AtomicU64>,
}

impl NotificationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RouterState> {
        // A panicking sink must not take event delivery down with it.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn register(&self, sink: Arc<dyn EventSink>) -> SinkId {
        let id = SinkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(?id, kind = ?sink.kind(), "sink registered");
        self.lock().sinks.push(Registered { id, sink });
        id
    }

    /// Remove a sink. Returns false if it was not registered.
    pub fn unregister(&self, id: SinkId) -> bool {
        let mut state = self.lock();
        let before = state.sinks.len();
        state.sinks.retain(|registered| registered.id != id);
        before != state.sinks.len()
    }

    pub fn set_stage(&self, stage: RouterStage) {
        tracing::debug!(?stage, "router stage changed");
        self.lock().stage = stage;
    }

    pub fn stage(&self) -> RouterStage {
        self.lock().stage
    }

    pub fn sink_count(&self) -> usize {
        self.lock().sinks.len()
    }

    /// Deliver an event to every receptive sink.
    ///
    /// Events aimed at surfaces that are not receptive, not registered, or
    /// torn down are dropped. Torn-down sinks are pruned. Returns the number
    /// of deliveries, for diagnostics only.
    pub fn emit(&self, event: impl Into<ShellEvent>) -> usize {
        let event = event.into();
        let mut state = self.lock();
        let stage = state.stage;
        let mut delivered = 0;
        let mut closed = Vec::new();

        for registered in &state.sinks {
            if !is_receptive(registered.sink.kind(), stage, &event) {
                continue;
            }
            match registered.sink.deliver(&event) {
                Ok(()) => delivered += 1,
                Err(SinkError::Closed) => closed.push(registered.id),
            }
        }

        if !closed.is_empty() {
            tracing::trace!(count = closed.len(), "dropping events for closed sinks");
            state.sinks.retain(|registered| !closed.contains(&registered.id));
        }

        delivered
    }
}

fn is_receptive(kind: SinkKind, stage: RouterStage, event: &ShellEvent) -> bool {
    match kind {
        SinkKind::Loading => stage == RouterStage::Startup,
        SinkKind::Main => stage == RouterStage::Running,
        SinkKind::Platform => event.is_notification(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::sink::ChannelSink;
    use at_protocol::event_models::{NotificationEvent, ProgressEvent};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn drain(rx: &mut UnboundedReceiver<ShellEvent>) -> Vec<ShellEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn channel(
        router: &NotificationRouter,
        kind: SinkKind,
    ) -> (SinkId, UnboundedReceiver<ShellEvent>) {
        let (sink, rx) = ChannelSink::new(kind);
        (router.register(Arc::new(sink)), rx)
    }

    #[test]
    fn test_emit_without_sinks_is_silent() {
        let router = NotificationRouter::new();
        assert_eq!(router.emit(ProgressEvent::new("nobody listening", 10)), 0);
    }

    #[test]
    fn test_loading_sink_only_receptive_during_startup() {
        let router = NotificationRouter::new();
        let (_, mut loading) = channel(&router, SinkKind::Loading);
        let (_, mut main) = channel(&router, SinkKind::Main);

        router.emit(ProgressEvent::new("starting", 10));
        router.set_stage(RouterStage::Running);
        router.emit(NotificationEvent::info("Ready", "Backend is up"));

        let loading_events = drain(&mut loading);
        let main_events = drain(&mut main);
        assert_eq!(loading_events.len(), 1);
        assert!(matches!(loading_events[0], ShellEvent::Progress(_)));
        assert_eq!(main_events.len(), 1);
        assert!(main_events[0].is_notification());
    }

    #[test]
    fn test_platform_sink_receives_only_notifications() {
        let router = NotificationRouter::new();
        let (_, mut platform) = channel(&router, SinkKind::Platform);

        router.emit(ProgressEvent::new("starting", 10));
        router.emit(NotificationEvent::error("Configuration error", "missing"));
        router.set_stage(RouterStage::Running);
        router.emit(ShellEvent::TriggerNewSnippet);
        router.emit(NotificationEvent::success("Copied", "ok"));

        let events = drain(&mut platform);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(ShellEvent::is_notification));
    }

    #[test]
    fn test_emission_order_preserved_per_sink() {
        let router = NotificationRouter::new();
        let (_, mut loading) = channel(&router, SinkKind::Loading);

        for percent in [10, 32, 35, 80, 100] {
            router.emit(ProgressEvent::new("progress", percent));
        }

        let percents: Vec<u8> = drain(&mut loading)
            .into_iter()
            .filter_map(|event| match event {
                ShellEvent::Progress(progress) => Some(progress.percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![10, 32, 35, 80, 100]);
    }

    #[test]
    fn test_torn_down_sink_is_dropped_and_pruned() {
        let router = NotificationRouter::new();
        let (_, loading) = channel(&router, SinkKind::Loading);
        let (_, mut other) = channel(&router, SinkKind::Loading);
        drop(loading);

        assert_eq!(router.emit(ProgressEvent::new("still fine", 10)), 1);
        assert_eq!(router.sink_count(), 1);
        assert_eq!(drain(&mut other).len(), 1);
    }

    #[test]
    fn test_unregister() {
        let router = NotificationRouter::new();
        let (id, mut rx) = channel(&router, SinkKind::Loading);

        assert!(router.unregister(id));
        assert!(!router.unregister(id));
        router.emit(ProgressEvent::new("after removal", 10));
        assert!(drain(&mut rx).is_empty());
    }
}
