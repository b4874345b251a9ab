//! Scripted health checks and startup prompts.

use async_trait::async_trait;
use at_core::bootstrap::StartupPrompt;
use at_core::probe::HealthCheck;
use at_protocol::lifecycle_models::FailureChoice;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Health check that fails until call `succeed_on` and records call times.
pub struct ScriptedHealth {
    succeed_on: Option<u32>,
    calls: AtomicU32,
    origin: Instant,
    call_offsets: Mutex<Vec<Duration>>,
}

#[allow(dead_code)]
impl ScriptedHealth {
    pub fn never() -> Self {
        Self::succeed_on(None)
    }

    pub fn on_attempt(attempt: u32) -> Self {
        Self::succeed_on(Some(attempt))
    }

    fn succeed_on(succeed_on: Option<u32>) -> Self {
        Self {
            succeed_on,
            calls: AtomicU32::new(0),
            origin: Instant::now(),
            call_offsets: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Time of each call, relative to construction.
    pub fn call_offsets(&self) -> Vec<Duration> {
        self.call_offsets.lock().map(|offsets| offsets.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HealthCheck for ScriptedHealth {
    async fn check(&self, _timeout: Duration) -> bool {
        if let Ok(mut offsets) = self.call_offsets.lock() {
            offsets.push(self.origin.elapsed());
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.succeed_on == Some(call)
    }

    fn target(&self) -> String {
        "scripted".to_string()
    }
}

/// Prompt that records what it was asked and answers with a fixed choice.
pub struct RecordingPrompt {
    choice: FailureChoice,
    faults: Mutex<Vec<String>>,
    readiness_failures: Mutex<Vec<u32>>,
}

#[allow(dead_code)]
impl RecordingPrompt {
    pub fn answering(choice: FailureChoice) -> Self {
        Self {
            choice,
            faults: Mutex::new(Vec::new()),
            readiness_failures: Mutex::new(Vec::new()),
        }
    }

    pub fn faults(&self) -> Vec<String> {
        self.faults.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn readiness_failures(&self) -> Vec<u32> {
        self.readiness_failures.lock().map(|f| f.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StartupPrompt for RecordingPrompt {
    async fn configuration_fault(&self, message: &str) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(message.to_string());
        }
    }

    async fn readiness_failed(&self, attempts: u32) -> FailureChoice {
        if let Ok(mut failures) = self.readiness_failures.lock() {
            failures.push(attempts);
        }
        self.choice
    }
}
