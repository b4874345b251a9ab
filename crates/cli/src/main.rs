//! `aparetext-shell`: runs the shell core headless, with the terminal as the
//! loading and main surfaces.

mod terminal;

use at_core::app::{health_check_from_config, Application};
use at_core::config::{default_config_path, load_config};
use at_core::logging;
use at_core::notify::{EventSink, NotificationRouter, SinkKind, TracingSink};
use at_core::probe::{ProbeConfig, ReadinessProber};
use at_core::snippets::SystemClipboard;
use at_protocol::config_models::{LaunchMode, ShellConfig};
use at_protocol::lifecycle_models::{BootPhase, ReadinessState};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use terminal::{JsonLinesSurface, TerminalPrompt, TerminalSurface};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "aparetext-shell")]
#[command(version, about = "ApareText desktop shell core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to shell.toml (default: <config_dir>/aparetext/shell.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Development mode: the backend is managed externally
    #[arg(long, global = true)]
    dev: bool,

    /// Backend executable, overriding the configured one
    #[arg(long, global = true, value_name = "PATH")]
    worker: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Directory for JSON log files (default: <data_dir>/aparetext/logs)
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Print surface events as JSON lines (renderer wire format)
    #[arg(long, global = true)]
    json_events: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Start the backend, wait for it and keep running until Ctrl-C (default)
    Run {
        #[command(flatten)]
        probe: ProbeArgs,
    },

    /// Only check backend readiness; exits 0 when ready, 1 otherwise
    Probe {
        #[command(flatten)]
        probe: ProbeArgs,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Default)]
struct ProbeArgs {
    /// Attempt budget
    #[arg(long)]
    attempts: Option<u32>,

    /// Spacing between attempts in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,
}

impl ProbeArgs {
    fn apply(&self, config: &mut ShellConfig) {
        if let Some(attempts) = self.attempts {
            config.probe.max_attempts = attempts.max(1);
        }
        if let Some(interval_ms) = self.interval_ms {
            config.probe.interval_ms = interval_ms.max(1);
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let log_dir = cli.log_dir.clone().or_else(logging::default_log_dir);
    let _guard = logging::init(&cli.log_level, log_dir);

    let mut config = load_config(cli.config.clone().or_else(default_config_path).as_deref())?;
    if cli.dev {
        config.mode = LaunchMode::Development;
    }
    if let Some(worker) = &cli.worker {
        config.worker.executable = worker.clone();
    }

    match cli.command.unwrap_or(Command::Run {
        probe: ProbeArgs::default(),
    }) {
        Command::Run { probe } => {
            probe.apply(&mut config);
            run(config, cli.json_events).await
        }
        Command::Probe { probe, json } => {
            probe.apply(&mut config);
            probe_once(config, json).await
        }
    }
}

async fn run(config: ShellConfig, json_events: bool) -> color_eyre::Result<ExitCode> {
    tracing::info!(mode = ?config.mode, backend = %config.backend.url, "starting shell");

    let mut app = Application::new(config, Arc::new(SystemClipboard))?;
    app.router().register(Arc::new(TracingSink));
    app.router().register(surface(SinkKind::Main, json_events));

    let shutdown = app.shutdown_token();
    cancel_on_ctrl_c(shutdown.clone());

    let loading = surface(SinkKind::Loading, json_events);
    let report = app.bootstrap(Some(loading), &TerminalPrompt).await?;

    let code = match report.outcome {
        BootPhase::Done | BootPhase::Degraded => {
            if json_events {
                tracing::info!("shell is running");
            } else {
                println!("{}", "Shell is running. Press Ctrl-C to quit.".green());
            }
            shutdown.cancelled().await;
            ExitCode::SUCCESS
        }
        _ => ExitCode::FAILURE,
    };

    app.shutdown().await;
    Ok(code)
}

async fn probe_once(config: ShellConfig, json: bool) -> color_eyre::Result<ExitCode> {
    let health = health_check_from_config(&config)?;
    let target = health.target();
    let probe = ProbeConfig::from_section(&config.probe);
    let (attempts, interval) = (probe.max_attempts, probe.interval);

    let router = NotificationRouter::new();
    if !json {
        router.register(Arc::new(TerminalSurface::new(SinkKind::Loading)));
    }

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let started = tokio::time::Instant::now();
    let mut prober = ReadinessProber::new(health, probe, router).with_cancellation(cancel);
    let state = prober.poll_until_ready(attempts, interval).await;
    let elapsed = started.elapsed();

    if json {
        let report = serde_json::json!({
            "target": target,
            "state": state,
            "elapsed_ms": elapsed.as_millis() as u64,
        });
        println!("{report}");
    } else if state == ReadinessState::Ready {
        println!("{} {target} after {}", "Ready:".green().bold(), format_elapsed(elapsed));
    } else {
        println!("{} {target} after {attempts} attempts", "Not ready:".red().bold());
    }

    Ok(if state == ReadinessState::Ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn surface(kind: SinkKind, json_events: bool) -> Arc<dyn EventSink> {
    if json_events {
        Arc::new(JsonLinesSurface::new(kind))
    } else {
        Arc::new(TerminalSurface::new(kind))
    }
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            token.cancel();
        }
    });
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}
