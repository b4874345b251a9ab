//! Test fixtures for configurations, sinks and worker scripts.

use at_core::notify::{ChannelSink, NotificationRouter, SinkId, SinkKind};
use at_protocol::config_models::{LaunchMode, ShellConfig};
use at_protocol::ipc::ShellEvent;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Development-mode configuration with a small probe budget.
#[allow(dead_code)]
pub fn dev_config(max_attempts: u32) -> ShellConfig {
    let mut config = ShellConfig::default();
    config.mode = LaunchMode::Development;
    config.probe.max_attempts = max_attempts;
    config
}

/// Production-mode configuration pointing at `executable`.
#[allow(dead_code)]
pub fn prod_config(executable: &Path) -> ShellConfig {
    let mut config = ShellConfig::default();
    config.mode = LaunchMode::Production;
    config.worker.executable = executable.to_path_buf();
    config
}

/// Register a channel-backed sink of `kind`.
#[allow(dead_code)]
pub fn channel_sink(
    router: &NotificationRouter,
    kind: SinkKind,
) -> (SinkId, UnboundedReceiver<ShellEvent>) {
    let (sink, rx) = ChannelSink::new(kind);
    (router.register(Arc::new(sink)), rx)
}

/// Everything currently buffered on `rx`.
#[allow(dead_code)]
pub fn drain(rx: &mut UnboundedReceiver<ShellEvent>) -> Vec<ShellEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Write an executable `/bin/sh` worker script into `dir`.
#[cfg(unix)]
#[allow(dead_code)]
pub fn worker_script(dir: &Path, body: &str) -> std::io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("aparetext-server");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Whether `pid` names a live (non-zombie) process.
#[cfg(unix)]
#[allow(dead_code)]
pub fn process_alive(pid: u32) -> bool {
    if let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        // The state letter follows the parenthesised command name.
        return stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.trim_start().chars().next())
            .is_some_and(|state| state != 'Z');
    }
    if Path::new("/proc/self/stat").exists() {
        return false;
    }
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Wait until a worker script has written a pid into `path`.
#[allow(dead_code)]
pub async fn read_pid_file(path: &Path) -> u32 {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        if let Some(pid) = std::fs::read_to_string(path)
            .ok()
            .and_then(|text| text.trim().parse().ok())
        {
            return pid;
        }
        assert!(tokio::time::Instant::now() < deadline, "no pid written to {}", path.display());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

/// Poll until `pid` is gone or `within` elapses; returns whether it is gone.
#[cfg(unix)]
#[allow(dead_code)]
pub async fn process_gone_within(pid: u32, within: std::time::Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while process_alive(pid) {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    true
}
