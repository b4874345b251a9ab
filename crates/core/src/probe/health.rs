//! Health-check transports.
//!
//! One [`HealthCheck`] is selected per deployment by `probe.transport`:
//! HTTP against the backend's health endpoint, or the subprocess bridge.

use anyhow::{bail, Context};
use async_trait::async_trait;
use at_protocol::config_models::BridgeSection;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// A single lightweight readiness check.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Run one check. Returns true iff the backend reports itself ready.
    ///
    /// Ordinary unavailability (refused connection, timeout, bad status) is
    /// `false`, never an error.
    async fn check(&self, timeout: Duration) -> bool;

    /// Human-readable target, for logs.
    fn target(&self) -> String;
}

/// `GET {base_url}{path}`; ready iff the status is 200.
#[derive(Debug, Clone)]
pub struct HttpHealthCheck {
    client: reqwest::Client,
    url: String,
}

impl HttpHealthCheck {
    pub fn new(base_url: &str, path: &str) -> reqwest::Result<Self> {
        // The backend is local; never route health checks through a proxy.
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), path),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthCheck for HttpHealthCheck {
    async fn check(&self, timeout: Duration) -> bool {
        match self.client.get(&self.url).timeout(timeout).send().await {
            Ok(response) => {
                let status = response.status();
                tracing::trace!(url = %self.url, %status, "health check response");
                status == reqwest::StatusCode::OK
            }
            Err(e) => {
                tracing::trace!(url = %self.url, error = %e, "health check failed");
                false
            }
        }
    }

    fn target(&self) -> String {
        self.url.clone()
    }
}

/// `<interpreter> <script> health`; ready iff it prints `{"status": "healthy"}`.
#[derive(Debug, Clone)]
pub struct BridgeHealthCheck {
    interpreter: PathBuf,
    script: PathBuf,
}

impl BridgeHealthCheck {
    pub fn new(interpreter: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
        }
    }

    /// Build from configuration, looking up `python3` then `python` on PATH
    /// when no interpreter is configured.
    pub fn from_config(bridge: &BridgeSection) -> anyhow::Result<Self> {
        let script = bridge
            .script
            .clone()
            .context("probe.bridge.script must be set for the bridge transport")?;

        let interpreter = match &bridge.interpreter {
            Some(interpreter) => interpreter.clone(),
            None => which::which("python3")
                .or_else(|_| which::which("python"))
                .context("no python interpreter found on PATH")?,
        };

        Ok(Self::new(interpreter, script))
    }

    async fn run(&self, timeout: Duration) -> anyhow::Result<bool> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(&self.script)
            .arg("health")
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(windows)]
        command.creation_flags(0x0800_0000);

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .context("bridge health call timed out")?
            .with_context(|| format!("failed to run {}", self.interpreter.display()))?;

        if !output.status.success() {
            bail!("bridge exited with {}", output.status);
        }

        let reply: serde_json::Value = serde_json::from_slice(&output.stdout)
            .context("bridge printed invalid JSON")?;
        Ok(reply.get("status").and_then(serde_json::Value::as_str) == Some("healthy"))
    }
}

#[async_trait]
impl HealthCheck for BridgeHealthCheck {
    async fn check(&self, timeout: Duration) -> bool {
        match self.run(timeout).await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::trace!(
                    script = %self.script.display(),
                    error = %format!("{e:#}"),
                    "bridge health check failed"
                );
                false
            }
        }
    }

    fn target(&self) -> String {
        format!("{} {} health", self.interpreter.display(), self.script.display())
    }
}
