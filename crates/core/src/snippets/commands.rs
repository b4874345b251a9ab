//! Shell command handlers.
//!
//! These are the requests the UI layer makes after startup. None of them
//! crash the shell on backend failure: list-style commands fall back to an
//! empty or default result, mutating commands reject the call, and every
//! failure is paired with an error notification.

use crate::config::{ConfigResult, SettingsStore};
use crate::notify::NotificationRouter;
use crate::schedule::TaskScheduler;
use crate::snippets::client::{SnippetClient, SnippetResult};
use crate::snippets::clipboard::{ClipboardAccess, ClipboardError};
use at_protocol::event_models::NotificationEvent;
use at_protocol::ipc::ShellEvent;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Scheduler key of the pending clipboard restore.
pub const CLIPBOARD_RESTORE_KEY: &str = "clipboard-restore";

/// Result of an expansion request, as returned to the UI.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExpandOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExpandOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(error: impl Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ShellCommands {
    client: SnippetClient,
    router: NotificationRouter,
    scheduler: TaskScheduler,
    clipboard: Arc<dyn ClipboardAccess>,
    restore_after: Duration,
    /// Clipboard text from before the first expansion of a burst.
    saved_clipboard: Arc<Mutex<Option<String>>>,
    settings: Option<SettingsStore>,
}

impl ShellCommands {
    pub fn new(
        client: SnippetClient,
        router: NotificationRouter,
        scheduler: TaskScheduler,
        clipboard: Arc<dyn ClipboardAccess>,
        restore_after: Duration,
    ) -> Self {
        Self {
            client,
            router,
            scheduler,
            clipboard,
            restore_after,
            saved_clipboard: Arc::new(Mutex::new(None)),
            settings: None,
        }
    }

    /// Back `get_settings`/`save_settings` with `store`.
    pub fn with_settings(mut self, store: SettingsStore) -> Self {
        self.settings = Some(store);
        self
    }

    pub fn client(&self) -> &SnippetClient {
        &self.client
    }

    fn report(&self, title: &str, error: &dyn Display) {
        tracing::error!(error = %error, "{title}");
        self.router.emit(NotificationEvent::error(title, error.to_string()));
    }

    fn reject<T>(&self, title: &str, result: SnippetResult<T>) -> SnippetResult<T> {
        if let Err(e) = &result {
            self.report(title, e);
        }
        result
    }

    pub async fn get_snippets(&self) -> Vec<Value> {
        self.client.list().await.unwrap_or_else(|e| {
            self.report("Could not load snippets", &e);
            Vec::new()
        })
    }

    pub async fn search_snippets(&self, query: &str) -> Vec<Value> {
        self.client.search(query).await.unwrap_or_else(|e| {
            self.report("Search failed", &e);
            Vec::new()
        })
    }

    pub async fn get_snippet(&self, id: &str) -> Option<Value> {
        self.client.get(id).await.unwrap_or_else(|e| {
            self.report("Could not load snippet", &e);
            None
        })
    }

    /// Expand a snippet and place the result on the clipboard.
    pub async fn expand_snippet(
        &self,
        snippet_id: &str,
        variables: &Map<String, Value>,
    ) -> ExpandOutcome {
        let content = match self.client.expand(snippet_id, variables).await {
            Ok(content) => content,
            Err(e) => {
                self.report("Expansion failed", &e);
                return ExpandOutcome::failed(e);
            }
        };

        match self.insert_text(&content) {
            Ok(()) => {
                tracing::info!(
                    snippet_id,
                    chars = content.chars().count(),
                    "snippet copied to clipboard"
                );
                ExpandOutcome::ok()
            }
            Err(e) => {
                self.report("Could not copy snippet", &e);
                ExpandOutcome::failed(e)
            }
        }
    }

    pub async fn create_snippet(&self, snippet: &Value) -> SnippetResult<Value> {
        let result = self.client.create(snippet).await;
        self.reject("Could not create snippet", result)
    }

    pub async fn update_snippet(&self, id: &str, snippet: &Value) -> SnippetResult<Value> {
        let result = self.client.update(id, snippet).await;
        self.reject("Could not update snippet", result)
    }

    pub async fn delete_snippet(&self, id: &str) -> SnippetResult<()> {
        let result = self.client.delete(id).await;
        self.reject("Could not delete snippet", result)
    }

    pub async fn stats(&self) -> SnippetResult<Value> {
        let result = self.client.stats().await;
        self.reject("Could not load statistics", result)
    }

    pub async fn export_snippets(&self) -> SnippetResult<Value> {
        let result = self.client.export().await;
        self.reject("Export failed", result)
    }

    pub async fn import_snippets(&self, data: &Value) -> SnippetResult<Value> {
        let result = self.client.import(data).await;
        self.reject("Import failed", result)
    }

    /// The persisted settings object; empty when there is none or it cannot
    /// be read.
    pub fn get_settings(&self) -> Map<String, Value> {
        let Some(store) = &self.settings else {
            return Map::new();
        };
        store.load().unwrap_or_else(|e| {
            self.report("Could not load settings", &e);
            Map::new()
        })
    }

    pub fn save_settings(&self, settings: &Map<String, Value>) -> ConfigResult<()> {
        let Some(store) = &self.settings else {
            tracing::warn!("no settings location, settings not saved");
            return Ok(());
        };
        let result = store.save(settings);
        if let Err(e) = &result {
            self.report("Could not save settings", e);
        }
        result
    }

    /// Ask the main surface to open its new-snippet form.
    pub fn open_manager_new(&self) {
        self.router.emit(ShellEvent::TriggerNewSnippet);
    }

    /// Put `text` on the clipboard and arm the restore of the previous text.
    ///
    /// Within a burst of insertions the text saved is the one from before
    /// the first insertion, and a single restore is re-armed each time.
    pub fn insert_text(&self, text: &str) -> Result<(), ClipboardError> {
        let previous = match self.clipboard.read_text() {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!(error = %e, "could not read clipboard before insertion");
                None
            }
        };

        self.clipboard.write_text(text)?;

        self.saved()
            .get_or_insert_with(|| previous.unwrap_or_default());

        let clipboard = self.clipboard.clone();
        let saved = self.saved_clipboard.clone();
        self.scheduler
            .schedule(CLIPBOARD_RESTORE_KEY, self.restore_after, async move {
                restore(clipboard.as_ref(), &saved);
            });
        Ok(())
    }

    /// Restore the saved clipboard text now, if a restore is pending.
    pub fn flush_clipboard_restore(&self) -> bool {
        self.scheduler.cancel(CLIPBOARD_RESTORE_KEY);
        restore(self.clipboard.as_ref(), &self.saved_clipboard)
    }

    fn saved(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.saved_clipboard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn restore(clipboard: &dyn ClipboardAccess, saved: &Mutex<Option<String>>) -> bool {
    let previous = saved.lock().unwrap_or_else(PoisonError::into_inner).take();
    let Some(previous) = previous else {
        return false;
    };

    match clipboard.write_text(&previous) {
        Ok(()) => {
            tracing::debug!("clipboard restored");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not restore clipboard");
            false
        }
    }
}
