//! Keyed, cancellable delayed tasks.
//!
//! Scheduling under a key that is already pending replaces the earlier task.
//! Everything still pending is cancelled by [`TaskScheduler::cancel_all`],
//! which the application calls on shutdown.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct Pending {
    generation: u64,
    token: CancellationToken,
}

#[derive(Clone, Default)]
pub struct TaskScheduler {
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    generation: Arc<AtomicU64>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Pending>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run `task` after `delay` unless cancelled or replaced first.
    pub fn schedule<F>(&self, key: impl Into<String>, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        let replaced = self.lock().insert(
            key.clone(),
            Pending {
                generation,
                token: token.clone(),
            },
        );
        if let Some(previous) = replaced {
            tracing::debug!(%key, "rescheduling task");
            previous.token.cancel();
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::trace!(%key, "scheduled task cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    scheduler.remove_if_current(&key, generation);
                    task.await;
                }
            }
        });
    }

    fn remove_if_current(&self, key: &str, generation: u64) {
        let mut pending = self.lock();
        if pending.get(key).map(|p| p.generation) == Some(generation) {
            pending.remove(key);
        }
    }

    /// Cancel the task under `key`. Returns false if none was pending.
    pub fn cancel(&self, key: &str) -> bool {
        match self.lock().remove(key) {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending task. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<Pending> = self.lock().drain().map(|(_, pending)| pending).collect();
        for pending in &drained {
            pending.token.cancel();
        }
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "cancelled scheduled tasks");
        }
        drained.len()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }
}
