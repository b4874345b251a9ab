//! # at-protocol
//!
//! Shared data model for the ApareText desktop shell.
//!
//! This crate defines the structures exchanged between the shell core and
//! the UI layer that renders the loading splash, palette and manager windows:
//! - Progress, worker-output and notification events
//! - Readiness and startup lifecycle states
//! - The wire messages pushed to UI surfaces
//! - Shell configuration models (`shell.toml`)
//!
//! ## Modules
//!
//! - [`event_models`]: Progress, output line and notification values
//! - [`lifecycle_models`]: Readiness state and bootstrap phases
//! - [`ipc`]: Router events and their UI wire form
//! - [`config_models`]: Shell configuration sections and defaults
//!
//! ## Design Principles
//!
//! - Minimal dependencies: only serde, ts-rs and chrono
//! - TypeScript generation: wire types derive `TS` for the renderer
//! - Independent compilation: no dependencies on other shell crates

pub mod config_models;
pub mod event_models;
pub mod ipc;
pub mod lifecycle_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use event_models::*;
pub use ipc::*;
pub use lifecycle_models::*;
