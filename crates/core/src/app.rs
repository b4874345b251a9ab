//! The application instance.
//!
//! Owns every long-lived component of one shell run: router, supervisor,
//! prober, task scheduler, command handlers and the shutdown token.

use crate::bootstrap::{BootReport, Bootstrapper, StartupPrompt, StartupTimings};
use crate::config::SettingsStore;
use crate::notify::{EventSink, NotificationRouter};
use crate::probe::{BridgeHealthCheck, HealthCheck, HttpHealthCheck, ProbeConfig, ReadinessProber};
use crate::schedule::TaskScheduler;
use crate::snippets::{ClipboardAccess, ShellCommands, SnippetClient, SnippetError};
use crate::supervisor::{ProcessSupervisor, WorkerSpec};
use at_protocol::config_models::{ProbeTransport, ShellConfig};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Failed to set up the HTTP health check: {0}")]
    HttpHealthCheck(#[source] reqwest::Error),

    #[error("Failed to set up the bridge health check: {0:#}")]
    BridgeHealthCheck(anyhow::Error),

    #[error(transparent)]
    SnippetClient(#[from] SnippetError),

    #[error("Application has already been bootstrapped")]
    AlreadyBootstrapped,
}

pub type ApplicationResult<T> = Result<T, ApplicationError>;

/// Build the health check selected by `probe.transport`.
pub fn health_check_from_config(config: &ShellConfig) -> ApplicationResult<Arc<dyn HealthCheck>> {
    match config.probe.transport {
        ProbeTransport::Http => {
            let check = HttpHealthCheck::new(&config.backend.url, &config.backend.health_path)
                .map_err(ApplicationError::HttpHealthCheck)?;
            Ok(Arc::new(check))
        }
        ProbeTransport::Bridge => {
            let check = BridgeHealthCheck::from_config(&config.probe.bridge)
                .map_err(ApplicationError::BridgeHealthCheck)?;
            Ok(Arc::new(check))
        }
    }
}

pub struct Application {
    config: ShellConfig,
    router: NotificationRouter,
    supervisor: ProcessSupervisor,
    prober: ReadinessProber,
    scheduler: TaskScheduler,
    commands: ShellCommands,
    shutdown: CancellationToken,
    bootstrapped: bool,
}

impl Application {
    /// Build the application with the health check named in `config`.
    pub fn new(
        config: ShellConfig,
        clipboard: Arc<dyn ClipboardAccess>,
    ) -> ApplicationResult<Self> {
        let health = health_check_from_config(&config)?;
        Self::with_health_check(config, health, clipboard)
    }

    /// Build the application around a given health check.
    pub fn with_health_check(
        config: ShellConfig,
        health: Arc<dyn HealthCheck>,
        clipboard: Arc<dyn ClipboardAccess>,
    ) -> ApplicationResult<Self> {
        let router = NotificationRouter::new();
        let shutdown = CancellationToken::new();
        let scheduler = TaskScheduler::new();

        let supervisor = ProcessSupervisor::new(WorkerSpec::from_config(&config), router.clone());
        let prober = ReadinessProber::new(
            health,
            ProbeConfig::from_section(&config.probe),
            router.clone(),
        )
        .with_cancellation(shutdown.clone());
        let mut commands = ShellCommands::new(
            SnippetClient::new(&config.backend.url)?,
            router.clone(),
            scheduler.clone(),
            clipboard,
            Duration::from_millis(config.clipboard.restore_after_ms),
        );
        if let Some(store) = SettingsStore::in_user_data_dir() {
            commands = commands.with_settings(store);
        }

        Ok(Self {
            config,
            router,
            supervisor,
            prober,
            scheduler,
            commands,
            shutdown,
            bootstrapped: false,
        })
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn router(&self) -> &NotificationRouter {
        &self.router
    }

    pub fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    pub fn prober(&self) -> &ReadinessProber {
        &self.prober
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn commands(&self) -> &ShellCommands {
        &self.commands
    }

    /// Token cancelled when shutdown is requested. Cancelling it from outside
    /// (e.g. on Ctrl-C) aborts a running bootstrap.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the startup pipeline. Fires at most once per application.
    pub async fn bootstrap(
        &mut self,
        loading: Option<Arc<dyn EventSink>>,
        prompt: &dyn StartupPrompt,
    ) -> ApplicationResult<BootReport> {
        if self.bootstrapped {
            return Err(ApplicationError::AlreadyBootstrapped);
        }
        self.bootstrapped = true;

        let mut bootstrapper = Bootstrapper::new(
            &self.supervisor,
            &mut self.prober,
            self.router.clone(),
            StartupTimings::from_section(&self.config.startup),
        )
        .with_cancellation(self.shutdown.clone());
        if let Some(sink) = loading {
            bootstrapper = bootstrapper.with_loading_surface(sink);
        }

        Ok(bootstrapper.run(prompt).await)
    }

    /// Stop everything: flush the clipboard restore, cancel scheduled tasks,
    /// stop the worker. Safe to call more than once.
    pub async fn shutdown(&self) {
        tracing::info!("shutting down");
        self.supervisor.begin_shutdown();
        self.shutdown.cancel();

        self.commands.flush_clipboard_restore();
        self.scheduler.cancel_all();
        self.supervisor.stop().await;
    }
}
