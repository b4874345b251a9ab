//! Snippet service access for the UI layer.

pub mod client;
pub mod clipboard;
pub mod commands;

pub use client::{SnippetClient, SnippetError, SnippetResult};
pub use clipboard::{ClipboardAccess, ClipboardError, MemoryClipboard, SystemClipboard};
pub use commands::{ExpandOutcome, ShellCommands, CLIPBOARD_RESTORE_KEY};
