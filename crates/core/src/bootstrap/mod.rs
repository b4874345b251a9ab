//! Startup sequencing.
//!
//! The bootstrapper runs the readiness pipeline exactly once:
//!
//! ```text
//! Init -> Starting -> Probing -> Done
//!                 |           \-> (prompt) -> Degraded | Aborted
//!                 \-> (configuration fault) -> Aborted
//! ```
//!
//! It owns no retry logic; failures resolve to a terminal phase and, where
//! the user has a say, a prompt.

use crate::notify::{EventSink, NotificationRouter, RouterStage};
use crate::probe::ReadinessProber;
use crate::supervisor::{ProcessSupervisor, StartOutcome};
use async_trait::async_trait;
use at_protocol::config_models::StartupSection;
use at_protocol::event_models::{NotificationEvent, ProgressEvent};
use at_protocol::lifecycle_models::{BootPhase, FailureChoice, ReadinessState};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Fixed delays of the startup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupTimings {
    /// Grace period after a worker was launched. Default: 1000 ms.
    pub settle_after_launch: Duration,
    /// Grace period when no worker was launched. Default: 500 ms.
    pub settle_without_worker: Duration,
    /// How long the ready state stays visible. Default: 1500 ms.
    pub ready_display: Duration,
}

impl Default for StartupTimings {
    fn default() -> Self {
        Self::from_section(&StartupSection::default())
    }
}

impl StartupTimings {
    pub fn from_section(section: &StartupSection) -> Self {
        Self {
            settle_after_launch: Duration::from_millis(section.settle_after_launch_ms),
            settle_without_worker: Duration::from_millis(section.settle_without_worker_ms),
            ready_display: Duration::from_millis(section.ready_display_ms),
        }
    }
}

/// Blocking user decisions taken during startup.
#[async_trait]
pub trait StartupPrompt: Send + Sync {
    /// Show a fatal configuration error. Returns once acknowledged.
    async fn configuration_fault(&self, message: &str);

    /// Ask whether to quit or continue without a ready backend.
    async fn readiness_failed(&self, attempts: u32) -> FailureChoice;
}

/// What happened during startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    /// Terminal phase: `Done`, `Degraded` or `Aborted`.
    pub outcome: BootPhase,
    /// Every phase entered, in order.
    pub phases: Vec<BootPhase>,
    pub readiness: ReadinessState,
    pub worker: StartOutcome,
}

/// Sequences supervisor, prober and router into the readiness pipeline.
///
/// Consumed by [`run`](Self::run), so a bootstrapper fires at most once.
pub struct Bootstrapper<'a> {
    supervisor: &'a ProcessSupervisor,
    prober: &'a mut ReadinessProber,
    router: NotificationRouter,
    timings: StartupTimings,
    loading: Option<Arc<dyn EventSink>>,
    cancel: CancellationToken,
    phases: Vec<BootPhase>,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(
        supervisor: &'a ProcessSupervisor,
        prober: &'a mut ReadinessProber,
        router: NotificationRouter,
        timings: StartupTimings,
    ) -> Self {
        Self {
            supervisor,
            prober,
            router,
            timings,
            loading: None,
            cancel: CancellationToken::new(),
            phases: Vec::new(),
        }
    }

    /// Surface registered for the duration of startup.
    pub fn with_loading_surface(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.loading = Some(sink);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn run(mut self, prompt: &dyn StartupPrompt) -> BootReport {
        self.enter(BootPhase::Init);
        self.router.set_stage(RouterStage::Startup);
        let loading_id = self.loading.take().map(|sink| self.router.register(sink));

        let report = self.sequence(prompt).await;

        if let Some(id) = loading_id {
            self.router.unregister(id);
        }
        tracing::info!(
            outcome = ?report.outcome,
            readiness = ?report.readiness,
            "startup finished"
        );
        report
    }

    async fn sequence(&mut self, prompt: &dyn StartupPrompt) -> BootReport {
        self.router.emit(ProgressEvent::new("Starting backend...", 10));

        let worker = self.supervisor.start().await;
        self.enter(BootPhase::Starting);

        let settle = match &worker {
            StartOutcome::Launched { .. } => self.timings.settle_after_launch,
            StartOutcome::ExternallyManaged | StartOutcome::SpawnFailed { .. } => {
                self.timings.settle_without_worker
            }
            StartOutcome::ConfigurationFault { path } => {
                let message = format!("Backend executable not found at {}", path.display());
                prompt.configuration_fault(&message).await;
                return self.finish(BootPhase::Aborted, worker);
            }
        };

        if !self.pause(settle).await {
            return self.finish(BootPhase::Aborted, worker);
        }

        self.enter(BootPhase::Probing);
        self.router.emit(ProgressEvent::new(
            "Connecting to backend...",
            self.prober.config().start_percent,
        ));
        let readiness = self.prober.poll().await;

        if self.cancel.is_cancelled() {
            return self.finish(BootPhase::Aborted, worker);
        }

        if readiness == ReadinessState::Ready {
            self.router.emit(ProgressEvent::new("Ready", 100));
            if !self.pause(self.timings.ready_display).await {
                return self.finish(BootPhase::Aborted, worker);
            }
            self.router.set_stage(RouterStage::Running);
            return self.finish(BootPhase::Done, worker);
        }

        let attempts = self.prober.config().max_attempts;
        let choice = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::info!("startup cancelled while waiting for an answer");
                return self.finish(BootPhase::Aborted, worker);
            }
            choice = prompt.readiness_failed(attempts) => choice,
        };

        match choice {
            FailureChoice::ContinueDegraded => {
                tracing::warn!("continuing without a ready backend");
                self.router.set_stage(RouterStage::Running);
                self.router.emit(NotificationEvent::info(
                    "Backend unavailable",
                    "Continuing without the backend; snippet features may not work.",
                ));
                self.finish(BootPhase::Degraded, worker)
            }
            FailureChoice::Quit => {
                tracing::info!("user chose to quit after readiness failure");
                self.supervisor.stop().await;
                self.finish(BootPhase::Aborted, worker)
            }
        }
    }

    fn enter(&mut self, phase: BootPhase) {
        tracing::debug!(?phase, "startup phase");
        self.phases.push(phase);
    }

    /// Sleep unless cancelled first. Returns false on cancellation.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::info!("startup cancelled");
                false
            }
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn finish(&mut self, outcome: BootPhase, worker: StartOutcome) -> BootReport {
        self.enter(outcome);
        BootReport {
            outcome,
            phases: std::mem::take(&mut self.phases),
            readiness: self.prober.state(),
            worker,
        }
    }
}

/// Prompt that answers without user interaction.
///
/// Used for unattended runs: configuration faults are logged and readiness
/// failures resolve to the fixed `choice`.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt {
    pub choice: FailureChoice,
}

#[async_trait]
impl StartupPrompt for FixedPrompt {
    async fn configuration_fault(&self, message: &str) {
        tracing::error!("{message}");
    }

    async fn readiness_failed(&self, attempts: u32) -> FailureChoice {
        tracing::warn!(
            attempts,
            choice = ?self.choice,
            "backend not ready, answering automatically"
        );
        self.choice
    }
}
