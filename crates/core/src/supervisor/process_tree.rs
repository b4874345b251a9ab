//! Stopping the worker together with everything it spawned.
//!
//! On Unix the worker leads its own process group, so the group is signalled
//! as a whole: TERM first, KILL for whatever outlives the grace period. On
//! Windows the tree is killed with `taskkill /t`.

use std::time::Duration;
use tokio::process::Child;

/// How long the worker gets to exit after TERM before it is killed.
pub(crate) const STOP_GRACE: Duration = Duration::from_millis(1500);

#[cfg(unix)]
mod unix_group {
    use libc::{c_int, pid_t, ESRCH};
    use std::io;

    pub const SIGTERM: c_int = libc::SIGTERM;
    pub const SIGKILL: c_int = libc::SIGKILL;

    /// Send `signal` to every process in group `pgid`.
    pub fn signal(pgid: u32, signal: c_int) -> io::Result<()> {
        let pgid = pid_t::try_from(pgid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        // SAFETY: kill() has no memory-safety requirements; a negative pid
        // addresses the process group.
        let rc = unsafe { libc::kill(-pgid, signal) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    /// True while any member of group `pgid` exists.
    pub fn alive(pgid: u32) -> bool {
        match signal(pgid, 0) {
            Ok(()) => true,
            Err(e) => e.raw_os_error() != Some(ESRCH),
        }
    }
}

/// Stop the worker and its descendants, reaping the worker itself.
#[cfg(unix)]
pub(crate) async fn terminate(child: &mut Child, pid: u32, grace: Duration) {
    if let Err(e) = unix_group::signal(pid, unix_group::SIGTERM) {
        tracing::debug!(pid, error = %e, "could not signal worker group");
    }

    let exited = tokio::time::timeout(grace, child.wait()).await.is_ok();
    if !exited {
        tracing::warn!(pid, grace_ms = grace.as_millis() as u64, "worker ignored TERM, killing");
        if let Err(e) = child.kill().await {
            tracing::warn!(pid, error = %e, "failed to kill worker");
        }
    }

    if unix_group::alive(pid) {
        tracing::debug!(pid, "killing remaining worker descendants");
        if let Err(e) = unix_group::signal(pid, unix_group::SIGKILL) {
            tracing::debug!(pid, error = %e, "could not kill worker group");
        }
    }
}

/// Stop the worker and its descendants, reaping the worker itself.
#[cfg(windows)]
pub(crate) async fn terminate(child: &mut Child, pid: u32, _grace: Duration) {
    use std::process::Stdio;

    let status = tokio::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .creation_flags(super::CREATE_NO_WINDOW)
        .status()
        .await;
    match status {
        Ok(status) if status.success() => {}
        Ok(status) => tracing::debug!(pid, ?status, "taskkill returned non-zero"),
        Err(e) => tracing::debug!(pid, error = %e, "taskkill failed to start"),
    }

    if matches!(child.try_wait(), Ok(None)) {
        if let Err(e) = child.kill().await {
            tracing::warn!(pid, error = %e, "failed to kill worker");
        }
    } else if let Err(e) = child.wait().await {
        tracing::debug!(pid, error = %e, "failed to reap worker");
    }
}

#[cfg(not(any(unix, windows)))]
pub(crate) async fn terminate(child: &mut Child, pid: u32, _grace: Duration) {
    if let Err(e) = child.kill().await {
        tracing::warn!(pid, error = %e, "failed to kill worker");
    }
}
