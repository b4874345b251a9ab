//! Lifecycle state models.
//!
//! This module defines the state enums for the readiness pipeline: the
//! prober's view of the backend and the bootstrapper's startup phases.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Readiness of the backend as observed by the prober.
///
/// Transitions during a normal run:
/// NotStarted -> Polling -> Ready
///
/// When the attempt budget runs out:
/// NotStarted -> Polling -> Failed
///
/// `Ready` and `Failed` are terminal until the prober is explicitly reset.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessState {
    /// No probe has been issued yet.
    #[default]
    NotStarted,

    /// Health checks are in flight.
    Polling,

    /// A health check succeeded.
    Ready,

    /// The attempt budget was exhausted (or polling was cancelled).
    Failed,
}

impl ReadinessState {
    /// Whether this state ends a polling run.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReadinessState::Ready | ReadinessState::Failed)
    }
}

/// Phase of the startup bootstrapper.
///
/// The bootstrapper walks Init -> Starting -> Probing and then ends in one of
/// the three terminal phases:
/// - Done: backend answered, hand off to window creation
/// - Degraded: backend never answered, user chose to continue anyway
/// - Aborted: configuration fault, user chose to quit, or shutdown requested
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BootPhase {
    Init,
    Starting,
    Probing,
    Done,
    Degraded,
    Aborted,
}

impl BootPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, BootPhase::Done | BootPhase::Degraded | BootPhase::Aborted)
    }
}

/// The user's answer when the backend never became ready.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub enum FailureChoice {
    Quit,
    ContinueDegraded,
}
