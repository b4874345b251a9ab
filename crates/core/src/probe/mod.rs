//! Readiness prober.
//!
//! Polls a [`HealthCheck`] with a bounded attempt budget, reporting progress
//! through the notification router. Attempts run strictly one after another,
//! spaced start-to-start by the configured interval. An attempt that overruns
//! the interval is still followed by a gap of a quarter interval.

pub mod health;

pub use health::{BridgeHealthCheck, HealthCheck, HttpHealthCheck};

use crate::notify::NotificationRouter;
use at_protocol::config_models::ProbeSection;
use at_protocol::event_models::ProgressEvent;
use at_protocol::lifecycle_models::ReadinessState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Retry and progress parameters of the prober.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Attempt budget. Default: 30.
    pub max_attempts: u32,
    /// Start-to-start spacing of attempts. Default: 1 s. After an attempt
    /// that overran it, the next one waits a quarter interval.
    pub interval: Duration,
    /// Upper bound of a single attempt. Default: 2 s.
    pub attempt_timeout: Duration,
    /// Progress before the first attempt. Default: 30.
    pub start_percent: u8,
    /// Progress after the last attempt. Default: 80.
    pub end_percent: u8,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::from_section(&ProbeSection::default())
    }
}

impl ProbeConfig {
    pub fn from_section(section: &ProbeSection) -> Self {
        Self {
            max_attempts: section.max_attempts,
            interval: Duration::from_millis(section.interval_ms),
            attempt_timeout: Duration::from_millis(section.attempt_timeout_ms),
            start_percent: section.start_percent,
            end_percent: section.end_percent,
        }
        .normalized()
    }

    /// Clamp the progress range to `start <= end <= 100`.
    pub fn normalized(mut self) -> Self {
        self.end_percent = self.end_percent.min(100);
        self.start_percent = self.start_percent.min(self.end_percent);
        self
    }

    /// Progress reported after failed attempt `attempt` of `max_attempts`.
    pub fn percent_after(&self, attempt: u32, max_attempts: u32) -> u8 {
        if max_attempts == 0 {
            return self.start_percent;
        }
        let span = u32::from(self.end_percent.saturating_sub(self.start_percent));
        let step = span * attempt.min(max_attempts) / max_attempts;
        // step <= span <= 100
        self.start_percent + u8::try_from(step).unwrap_or(0)
    }
}

/// Polls the backend until it is ready or the budget runs out.
pub struct ReadinessProber {
    health: Arc<dyn HealthCheck>,
    config: ProbeConfig,
    router: NotificationRouter,
    state: ReadinessState,
    cancel: CancellationToken,
}

impl ReadinessProber {
    pub fn new(
        health: Arc<dyn HealthCheck>,
        config: ProbeConfig,
        router: NotificationRouter,
    ) -> Self {
        Self {
            health,
            config: config.normalized(),
            router,
            state: ReadinessState::NotStarted,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop polling (with `Failed`) once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    /// Return to `NotStarted` so the next poll probes again.
    pub fn reset(&mut self) {
        self.state = ReadinessState::NotStarted;
    }

    /// Poll with the configured budget and interval.
    pub async fn poll(&mut self) -> ReadinessState {
        let (max_attempts, interval) = (self.config.max_attempts, self.config.interval);
        self.poll_until_ready(max_attempts, interval).await
    }

    /// Poll up to `max_attempts` times, `interval` apart.
    ///
    /// Returns `Ready` on the first successful check and `Failed` once the
    /// budget is exhausted or polling is cancelled. Terminal states are
    /// sticky until [`reset`](Self::reset).
    pub async fn poll_until_ready(
        &mut self,
        max_attempts: u32,
        interval: Duration,
    ) -> ReadinessState {
        if self.state.is_terminal() {
            tracing::debug!(state = ?self.state, "readiness already settled");
            return self.state;
        }

        if max_attempts == 0 {
            tracing::warn!("readiness probe has no attempt budget");
            self.state = ReadinessState::Failed;
            return self.state;
        }

        self.state = ReadinessState::Polling;
        let target = self.health.target();
        tracing::info!(
            %target,
            max_attempts,
            interval_ms = interval.as_millis() as u64,
            "waiting for backend"
        );

        let mut next_due = Instant::now();
        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return self.cancelled(attempt - 1),
                    _ = tokio::time::sleep_until(next_due) => {}
                }
            }

            let attempt_started = Instant::now();
            let ready = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return self.cancelled(attempt - 1),
                result = tokio::time::timeout(
                    self.config.attempt_timeout,
                    self.health.check(self.config.attempt_timeout),
                ) => result.unwrap_or(false),
            };

            if ready {
                tracing::info!(%target, attempt, "backend is ready");
                self.state = ReadinessState::Ready;
                return self.state;
            }

            next_due = (attempt_started + interval).max(Instant::now() + interval / 4);
            tracing::debug!(%target, attempt, max_attempts, "backend not ready yet");
            self.router.emit(ProgressEvent::new(
                format!("Waiting for backend... ({attempt}/{max_attempts})"),
                self.config.percent_after(attempt, max_attempts),
            ));
        }

        tracing::warn!(%target, max_attempts, "backend did not become ready");
        self.state = ReadinessState::Failed;
        self.state
    }

    fn cancelled(&mut self, attempts: u32) -> ReadinessState {
        tracing::info!(attempts, "readiness polling cancelled");
        self.state = ReadinessState::Failed;
        self.state
    }
}
