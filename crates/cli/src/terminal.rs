//! Terminal stand-ins for the desktop surfaces.

use async_trait::async_trait;
use at_core::bootstrap::StartupPrompt;
use at_core::notify::{EventSink, SinkError, SinkKind};
use at_protocol::event_models::{OutputStream, Severity};
use at_protocol::ipc::{ShellEvent, UiMessage};
use at_protocol::lifecycle_models::FailureChoice;
use colored::Colorize;
use std::io::{BufRead, IsTerminal, Write};
use tokio::sync::oneshot;

/// Prints shell events to stdout, one line each.
pub struct TerminalSurface {
    kind: SinkKind,
}

impl TerminalSurface {
    pub fn new(kind: SinkKind) -> Self {
        Self { kind }
    }
}

impl EventSink for TerminalSurface {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn deliver(&self, event: &ShellEvent) -> Result<(), SinkError> {
        let line = match event {
            ShellEvent::Progress(progress) => {
                format!("[{:>3}%] {}", progress.percent, progress.message)
                    .cyan()
                    .to_string()
            }
            ShellEvent::Output(output) => match output.stream {
                OutputStream::Stdout => output.tagged().dimmed().to_string(),
                OutputStream::Stderr => output.tagged().yellow().to_string(),
            },
            ShellEvent::Notification(notification) => {
                let title = match notification.severity {
                    Severity::Error => notification.title.red().bold(),
                    Severity::Success => notification.title.green().bold(),
                    Severity::Info => notification.title.blue().bold(),
                };
                format!("{title}: {}", notification.body)
            }
            ShellEvent::TriggerNewSnippet => "New snippet requested".bold().to_string(),
        };

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}").map_err(|_| SinkError::Closed)
    }
}

/// Prints shell events to stdout as [`UiMessage`] JSON, one object per line.
///
/// Lets a renderer process drive its windows from the shell's output.
pub struct JsonLinesSurface {
    kind: SinkKind,
}

impl JsonLinesSurface {
    pub fn new(kind: SinkKind) -> Self {
        Self { kind }
    }
}

impl EventSink for JsonLinesSurface {
    fn kind(&self) -> SinkKind {
        self.kind
    }

    fn deliver(&self, event: &ShellEvent) -> Result<(), SinkError> {
        let line = serde_json::to_string(&UiMessage::from(event)).map_err(|e| {
            tracing::warn!(error = %e, "failed to encode ui message");
            SinkError::Closed
        })?;

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}").map_err(|_| SinkError::Closed)
    }
}

/// Asks startup questions on the terminal.
///
/// Without an interactive stdin every readiness failure resolves to
/// [`FailureChoice::Quit`].
pub struct TerminalPrompt;

#[async_trait]
impl StartupPrompt for TerminalPrompt {
    async fn configuration_fault(&self, message: &str) {
        eprintln!("{} {message}", "Configuration error:".red().bold());
        eprintln!("Please reinstall the application.");
    }

    async fn readiness_failed(&self, attempts: u32) -> FailureChoice {
        eprintln!(
            "{} no response after {attempts} attempts.",
            "Backend did not become ready:".red().bold()
        );

        if !std::io::stdin().is_terminal() {
            return FailureChoice::Quit;
        }

        eprint!("Continue without the backend? [y/N] ");
        let _ = std::io::stderr().flush();

        match read_answer().await {
            Ok(answer) => parse_choice(&answer),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read answer");
                FailureChoice::Quit
            }
        }
    }
}

/// Read one line from stdin on a detached thread.
///
/// A blocking read cannot be interrupted, so the thread is left behind if
/// the caller stops waiting; it does not hold up process exit.
async fn read_answer() -> std::io::Result<String> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut answer = String::new();
        let result = std::io::stdin().lock().read_line(&mut answer).map(|_| answer);
        let _ = tx.send(result);
    });
    rx.await.unwrap_or_else(|_| Err(std::io::Error::other("stdin reader stopped")))
}

fn parse_choice(answer: &str) -> FailureChoice {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "c" | "continue" => FailureChoice::ContinueDegraded,
        _ => FailureChoice::Quit,
    }
}
