use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long `stop` waits, in total, for the output readers to drain after
/// the child has been reaped.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// A live worker process.
///
/// Owned exclusively by the supervisor. The child itself lives inside the
/// exit-watcher task; this handle carries what is needed to stop it.
#[derive(Debug)]
pub struct WorkerHandle {
    pid: u32,
    started_at: DateTime<Utc>,
    stop_token: CancellationToken,
    terminated: Arc<AtomicBool>,
    watcher: JoinHandle<()>,
    readers: Vec<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn new(
        pid: u32,
        stop_token: CancellationToken,
        terminated: Arc<AtomicBool>,
        watcher: JoinHandle<()>,
        readers: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            pid,
            started_at: Utc::now(),
            stop_token,
            terminated,
            watcher,
            readers,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// True once the process has exited or a stop was requested.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Stop and reap the process tree, then wait briefly for the readers.
    pub(crate) async fn terminate(mut self) {
        self.terminated.store(true, Ordering::SeqCst);
        self.stop_token.cancel();

        if let Err(e) = (&mut self.watcher).await {
            tracing::warn!(pid = self.pid, error = %e, "exit watcher did not finish cleanly");
        }

        let readers = &mut self.readers;
        let drained = tokio::time::timeout(READER_DRAIN_TIMEOUT, async {
            for reader in readers.iter_mut() {
                let _ = reader.await;
            }
        })
        .await;

        if drained.is_err() {
            tracing::debug!(pid = self.pid, "output readers still busy, aborting");
            for reader in &self.readers {
                reader.abort();
            }
        }
    }
}
