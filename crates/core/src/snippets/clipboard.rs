//! Clipboard access.

use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("Clipboard is unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to read clipboard: {0}")]
    Read(String),

    #[error("Failed to write clipboard: {0}")]
    Write(String),
}

/// Plain-text clipboard.
pub trait ClipboardAccess: Send + Sync {
    /// Current text, or `None` if the clipboard holds no text.
    fn read_text(&self) -> Result<Option<String>, ClipboardError>;

    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard via `arboard`.
///
/// A fresh `arboard::Clipboard` is opened per operation; the handle is not
/// `Send` on every platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    fn open() -> Result<arboard::Clipboard, ClipboardError> {
        arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }
}

impl ClipboardAccess for SystemClipboard {
    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        match Self::open()?.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(ClipboardError::Read(e.to_string())),
        }
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        Self::open()?
            .set_text(text)
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

/// In-process clipboard for headless runs.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new(initial: Option<&str>) -> Self {
        Self {
            text: Mutex::new(initial.map(str::to_string)),
        }
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        Ok(self.text.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = Some(text.to_string());
        Ok(())
    }
}
