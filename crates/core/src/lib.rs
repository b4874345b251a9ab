//! # at-core
//!
//! Backend lifecycle, readiness probing and event routing for the ApareText
//! desktop shell.
//!
//! This crate provides:
//! - Supervision of the optional backend worker process
//! - Bounded readiness polling of the backend's health endpoint
//! - Fan-out of progress and notification events to UI surfaces
//! - The startup pipeline tying those together
//!
//! ## Modules
//!
//! - [`app`]: The application instance owning every component
//! - [`bootstrap`]: Startup sequencing and user prompts
//! - [`config`]: `shell.toml` loading and the persisted settings blob
//! - [`logging`]: tracing subscriber setup
//! - [`notify`]: Notification router and event sinks
//! - [`probe`]: Readiness prober and health-check transports
//! - [`schedule`]: Keyed, cancellable delayed tasks
//! - [`snippets`]: Snippet service client and shell command handlers
//! - [`supervisor`]: Worker process supervisor

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod notify;
pub mod probe;
pub mod schedule;
pub mod snippets;
pub mod supervisor;

pub use app::{Application, ApplicationError};
