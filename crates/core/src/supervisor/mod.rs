//! Worker process supervisor.
//!
//! Owns the lifecycle of the optional backend worker: launch (production
//! mode only), output capture, unexpected-exit detection and stop. At most
//! one worker handle is live at a time.

pub mod handle;
pub mod output;
mod process_tree;

pub use handle::WorkerHandle;

use crate::notify::NotificationRouter;
use at_protocol::config_models::{LaunchMode, OutputEncoding, ShellConfig};
use at_protocol::event_models::{NotificationEvent, OutputStream};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Everything needed to launch the worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSpec {
    pub mode: LaunchMode,
    /// Fully resolved executable path.
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub encoding: OutputEncoding,
}

impl WorkerSpec {
    /// Resolve the worker from configuration.
    ///
    /// A relative `worker.executable` is looked up in `worker.resources_dir`,
    /// which defaults to `resources/backend` beside the running executable.
    pub fn from_config(config: &ShellConfig) -> Self {
        let worker = &config.worker;
        let executable = if worker.executable.is_absolute() {
            worker.executable.clone()
        } else {
            let resources = worker
                .resources_dir
                .clone()
                .unwrap_or_else(default_resources_dir);
            resources.join(&worker.executable)
        };

        Self {
            mode: config.mode,
            executable,
            args: worker.args.clone(),
            encoding: worker.encoding,
        }
    }
}

fn default_resources_dir() -> PathBuf {
    let base = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    base.join("resources").join("backend")
}

/// Result of [`ProcessSupervisor::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A worker is running under our supervision.
    Launched { pid: u32 },

    /// Development mode: the worker is started out-of-band.
    ExternallyManaged,

    /// The executable does not exist.
    ConfigurationFault { path: PathBuf },

    /// The executable exists but could not be started.
    SpawnFailed { reason: String },
}

impl StartOutcome {
    /// Pid of the launched worker; `None` when nothing runs under supervision.
    pub fn pid(&self) -> Option<u32> {
        match self {
            StartOutcome::Launched { pid } => Some(*pid),
            _ => None,
        }
    }

    pub fn launched(&self) -> bool {
        self.pid().is_some()
    }
}

/// Supervises the backend worker process.
pub struct ProcessSupervisor {
    spec: WorkerSpec,
    router: NotificationRouter,
    slot: Arc<Mutex<Option<WorkerHandle>>>,
    shutting_down: Arc<AtomicBool>,
}

impl ProcessSupervisor {
    pub fn new(spec: WorkerSpec, router: NotificationRouter) -> Self {
        Self {
            spec,
            router,
            slot: Arc::new(Mutex::new(None)),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    /// Launch the worker unless it is externally managed.
    ///
    /// Launch is fire-and-forget: this returns as soon as the process is
    /// spawned, without waiting for it to become ready.
    pub async fn start(&self) -> StartOutcome {
        if self.spec.mode == LaunchMode::Development {
            tracing::info!("development mode, worker is managed externally");
            return StartOutcome::ExternallyManaged;
        }

        let mut slot = self.slot.lock().await;
        if let Some(handle) = slot.as_ref() {
            tracing::debug!(pid = handle.pid(), "worker already running");
            return StartOutcome::Launched { pid: handle.pid() };
        }

        let executable = &self.spec.executable;
        if !executable.is_file() {
            tracing::error!(path = %executable.display(), "worker executable not found");
            self.router.emit(NotificationEvent::error(
                "Configuration error",
                format!("Backend executable not found at {}", executable.display()),
            ));
            return StartOutcome::ConfigurationFault {
                path: executable.clone(),
            };
        }

        let mut child = match self.command().spawn() {
            Ok(child) => child,
            Err(e) => return self.spawn_failed(e.to_string()),
        };

        let Some(pid) = child.id() else {
            return self.spawn_failed("worker exited before its pid could be read".to_string());
        };

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(output::spawn_reader(
                stdout,
                OutputStream::Stdout,
                self.spec.encoding,
                self.router.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(output::spawn_reader(
                stderr,
                OutputStream::Stderr,
                self.spec.encoding,
                self.router.clone(),
            ));
        }

        let stop_token = CancellationToken::new();
        let terminated = Arc::new(AtomicBool::new(false));
        let watcher = tokio::spawn(watch_exit(
            child,
            pid,
            stop_token.clone(),
            terminated.clone(),
            ExitContext {
                slot: self.slot.clone(),
                shutting_down: self.shutting_down.clone(),
                router: self.router.clone(),
            },
        ));

        tracing::info!(pid, path = %executable.display(), "worker launched");
        *slot = Some(WorkerHandle::new(pid, stop_token, terminated, watcher, readers));

        StartOutcome::Launched { pid }
    }

    fn spawn_failed(&self, reason: String) -> StartOutcome {
        let executable = self.spec.executable.display();
        tracing::error!(path = %executable, %reason, "failed to spawn worker");
        self.router.emit(NotificationEvent::error(
            "Backend failed to start",
            format!("Could not launch {executable}: {reason}"),
        ));
        StartOutcome::SpawnFailed { reason }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.spec.executable);
        command
            .args(&self.spec.args)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = self.spec.executable.parent() {
            command.current_dir(dir);
        }

        #[cfg(unix)]
        command.process_group(0);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        command
    }

    /// Mark the application as shutting down; later exits are expected.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Stop the worker if one is live. Idempotent.
    pub async fn stop(&self) {
        // Release the slot before waiting on the watcher, which may need it.
        let handle = self.slot.lock().await.take();
        let Some(handle) = handle else {
            tracing::debug!("stop requested with no live worker");
            return;
        };

        let pid = handle.pid();
        tracing::info!(pid, "stopping worker");
        handle.terminate().await;
        tracing::info!(pid, "worker stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub async fn pid(&self) -> Option<u32> {
        self.slot.lock().await.as_ref().map(WorkerHandle::pid)
    }
}

struct ExitContext {
    slot: Arc<Mutex<Option<WorkerHandle>>>,
    shutting_down: Arc<AtomicBool>,
    router: NotificationRouter,
}

async fn watch_exit(
    mut child: Child,
    pid: u32,
    stop_token: CancellationToken,
    terminated: Arc<AtomicBool>,
    ctx: ExitContext,
) {
    tokio::select! {
        status = child.wait() => {
            if terminated.swap(true, Ordering::SeqCst) {
                tracing::debug!(pid, ?status, "worker exited during stop");
                return;
            }

            {
                let mut slot = ctx.slot.lock().await;
                if slot.as_ref().map(WorkerHandle::pid) == Some(pid) {
                    slot.take();
                }
            }

            if ctx.shutting_down.load(Ordering::SeqCst) {
                tracing::debug!(pid, ?status, "worker exited during shutdown");
                return;
            }

            let detail = match &status {
                Ok(status) => status.to_string(),
                Err(e) => e.to_string(),
            };
            tracing::error!(pid, status = %detail, "worker exited unexpectedly");

            ctx.router.emit(NotificationEvent::error(
                "Backend stopped",
                format!("The backend process exited unexpectedly ({detail})"),
            ));
        }
        _ = stop_token.cancelled() => {
            process_tree::terminate(&mut child, pid, process_tree::STOP_GRACE).await;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::notify::{ChannelSink, SinkKind};
    use at_protocol::ipc::ShellEvent;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;
    use tempfile::TempDir;

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("worker.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write worker script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod worker script");
        path
    }

    fn spec(executable: PathBuf) -> WorkerSpec {
        WorkerSpec {
            mode: LaunchMode::Production,
            executable,
            args: Vec::new(),
            encoding: OutputEncoding::Utf8,
        }
    }

    #[test]
    fn test_relative_executable_resolves_against_resources_dir() {
        let mut config = ShellConfig::default();
        config.worker.resources_dir = Some(PathBuf::from("/opt/aparetext/resources/backend"));
        config.worker.executable = PathBuf::from("aparetext-server");

        let spec = WorkerSpec::from_config(&config);
        assert_eq!(
            spec.executable,
            PathBuf::from("/opt/aparetext/resources/backend/aparetext-server")
        );

        config.worker.executable = PathBuf::from("/usr/local/bin/server");
        assert_eq!(
            WorkerSpec::from_config(&config).executable,
            PathBuf::from("/usr/local/bin/server")
        );
    }

    #[tokio::test]
    async fn test_development_mode_never_spawns() {
        let mut spec = spec(PathBuf::from("/definitely/not/here"));
        spec.mode = LaunchMode::Development;
        let supervisor = ProcessSupervisor::new(spec, NotificationRouter::new());

        let outcome = supervisor.start().await;

        assert_eq!(outcome, StartOutcome::ExternallyManaged);
        assert_eq!(outcome.pid(), None);
        assert!(!supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_launch_captures_output_and_stop_kills() {
        let dir = TempDir::new().expect("temp dir");
        let path = script(&dir, "echo booting\necho oops >&2\nexec sleep 30");
        let router = NotificationRouter::new();
        let (sink, mut rx) = ChannelSink::new(SinkKind::Loading);
        router.register(Arc::new(sink));

        let supervisor = ProcessSupervisor::new(spec(path), router);
        let outcome = supervisor.start().await;
        let pid = outcome.pid().expect("worker should launch");
        assert_eq!(supervisor.pid().await, Some(pid));

        let mut tagged = Vec::new();
        while tagged.len() < 2 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for output")
                .expect("router dropped");
            if let ShellEvent::Output(line) = event {
                tagged.push(line.tagged());
            }
        }
        tagged.sort();
        assert_eq!(tagged, vec!["[ERROR] oops", "[INFO] booting"]);

        supervisor.stop().await;
        assert!(!supervisor.is_running().await);

        // A requested stop is not an unexpected exit.
        while let Ok(event) = rx.try_recv() {
            assert!(!event.is_notification(), "unexpected notification: {event:?}");
        }
    }

    #[tokio::test]
    async fn test_worker_gone_before_pid_is_reported_as_spawn_failure() {
        let router = NotificationRouter::new();
        let (sink, mut rx) = ChannelSink::new(SinkKind::Platform);
        router.register(Arc::new(sink));
        let supervisor = ProcessSupervisor::new(spec(PathBuf::from("/opt/worker")), router);

        let outcome =
            supervisor.spawn_failed("worker exited before its pid could be read".to_string());

        assert!(matches!(outcome, StartOutcome::SpawnFailed { .. }));
        match rx.try_recv() {
            Ok(ShellEvent::Notification(notification)) => {
                assert_eq!(notification.title, "Backend failed to start");
                assert!(notification.body.contains("/opt/worker"));
            }
            other => panic!("expected a notification, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_start_reuses_live_worker() {
        let dir = TempDir::new().expect("temp dir");
        let supervisor =
            ProcessSupervisor::new(spec(script(&dir, "exec sleep 30")), NotificationRouter::new());

        let first = supervisor.start().await;
        let second = supervisor.start().await;
        assert!(first.launched());
        assert_eq!(first, second);

        supervisor.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let supervisor = ProcessSupervisor::new(
            spec(PathBuf::from("/definitely/not/here")),
            NotificationRouter::new(),
        );

        supervisor.stop().await;
        supervisor.stop().await;
        assert!(!supervisor.is_running().await);
    }

    #[tokio::test]
    async fn test_exit_during_shutdown_is_not_reported() {
        let dir = TempDir::new().expect("temp dir");
        let router = NotificationRouter::new();
        let (sink, mut rx) = ChannelSink::new(SinkKind::Platform);
        router.register(Arc::new(sink));

        let supervisor = ProcessSupervisor::new(spec(script(&dir, "sleep 0.2")), router);
        supervisor.begin_shutdown();
        assert!(supervisor.start().await.launched());

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(rx.try_recv().is_err());
        assert!(!supervisor.is_running().await);
        supervisor.stop().await;
    }
}
