//! HTTP client for the snippet service.
//!
//! Request and response bodies are passed through as JSON values; their
//! schema belongs to the backend.

use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Tag sent with expansion requests so the backend can attribute usage.
pub const EXPAND_SOURCE: &str = "palette";
pub const EXPAND_TARGET_APP: &str = "desktop-shell";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum SnippetError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

pub type SnippetResult<T> = Result<T, SnippetError>;

/// Typed access to the snippet service's REST API.
#[derive(Debug, Clone)]
pub struct SnippetClient {
    client: reqwest::Client,
    base_url: String,
}

impl SnippetClient {
    pub fn new(base_url: &str) -> SnippetResult<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SnippetError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> SnippetResult<reqwest::Response> {
        let response = request.send().await.map_err(|source| SnippetError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SnippetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn json(&self, request: reqwest::RequestBuilder, url: &str) -> SnippetResult<Value> {
        self.send(request, url)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| SnippetError::InvalidResponse {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn list_at(&self, path: &str) -> SnippetResult<Vec<Value>> {
        let url = self.url(path);
        match self.json(self.client.get(&url), &url).await? {
            Value::Array(items) => Ok(items),
            other => Err(SnippetError::InvalidResponse {
                url,
                reason: format!("expected a JSON array, got {other}"),
            }),
        }
    }

    /// `GET /api/snippets`
    pub async fn list(&self) -> SnippetResult<Vec<Value>> {
        self.list_at("/api/snippets").await
    }

    /// `GET /api/snippets/search/{query}`, query percent-encoded.
    pub async fn search(&self, query: &str) -> SnippetResult<Vec<Value>> {
        self.list_at(&format!("/api/snippets/search/{}", urlencoding::encode(query)))
            .await
    }

    /// `GET /api/snippets/{id}`. A 404 is `Ok(None)`.
    pub async fn get(&self, id: &str) -> SnippetResult<Option<Value>> {
        let url = self.url(&format!("/api/snippets/{}", urlencoding::encode(id)));
        match self.json(self.client.get(&url), &url).await {
            Ok(snippet) => Ok(Some(snippet)),
            Err(SnippetError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `POST /api/snippets/expand`. Returns the expanded text.
    pub async fn expand(
        &self,
        snippet_id: &str,
        variables: &Map<String, Value>,
    ) -> SnippetResult<String> {
        let url = self.url("/api/snippets/expand");
        let body = json!({
            "snippet_id": snippet_id,
            "variables": variables,
            "source": EXPAND_SOURCE,
            "target_app": EXPAND_TARGET_APP,
        });

        let reply = self.json(self.client.post(&url).json(&body), &url).await?;
        match reply.get("content").and_then(Value::as_str) {
            Some(content) => Ok(content.to_string()),
            None => Err(SnippetError::InvalidResponse {
                url,
                reason: "missing 'content' field".to_string(),
            }),
        }
    }

    /// `POST /api/snippets`
    pub async fn create(&self, snippet: &Value) -> SnippetResult<Value> {
        let url = self.url("/api/snippets");
        self.json(self.client.post(&url).json(snippet), &url).await
    }

    /// `PUT /api/snippets/{id}`
    pub async fn update(&self, id: &str, snippet: &Value) -> SnippetResult<Value> {
        let url = self.url(&format!("/api/snippets/{}", urlencoding::encode(id)));
        self.json(self.client.put(&url).json(snippet), &url).await
    }

    /// `DELETE /api/snippets/{id}`
    pub async fn delete(&self, id: &str) -> SnippetResult<()> {
        let url = self.url(&format!("/api/snippets/{}", urlencoding::encode(id)));
        self.send(self.client.delete(&url), &url).await?;
        Ok(())
    }

    /// `GET /api/stats`
    pub async fn stats(&self) -> SnippetResult<Value> {
        let url = self.url("/api/stats");
        self.json(self.client.get(&url), &url).await
    }

    /// `GET /api/export`
    pub async fn export(&self) -> SnippetResult<Value> {
        let url = self.url("/api/export");
        self.json(self.client.get(&url), &url).await
    }

    /// `POST /api/import`
    pub async fn import(&self, data: &Value) -> SnippetResult<Value> {
        let url = self.url("/api/import");
        self.json(self.client.post(&url).json(data), &url).await
    }
}
