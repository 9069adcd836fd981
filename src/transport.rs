//! Chat transport for Ollama-compatible backends
//!
//! The transport seam is deliberately thin: one streaming chat call and
//! one model listing call. [`OllamaTransport`] speaks the real HTTP API;
//! tests script the trait with an in-memory implementation.

use crate::config::OllamaConfig;
use crate::error::{OzetteError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;

/// Raw response body as a stream of transport-sized byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// One message in the outgoing request payload
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request payload for the streaming chat endpoint
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// One entry from the backend's model listing
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub modified_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub size: u64,
}

/// Response from the `/api/tags` endpoint
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelEntry>,
}

/// Abstract inference transport consumed by the session
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open a streaming chat exchange, returning the raw byte stream
    ///
    /// An error here means the transport failed before any response bytes
    /// arrived; the session surfaces it as a failed submit.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ByteStream>;

    /// List models available on the backend
    async fn list_models(&self) -> Result<Vec<ModelEntry>>;
}

/// HTTP transport speaking the Ollama API
///
/// # Examples
///
/// ```
/// use ozette::config::OllamaConfig;
/// use ozette::transport::OllamaTransport;
///
/// let transport = OllamaTransport::new(&OllamaConfig::default());
/// assert!(transport.is_ok());
/// ```
pub struct OllamaTransport {
    client: reqwest::Client,
    host: String,
}

impl OllamaTransport {
    /// Build a transport for the configured host
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("ozette/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OzetteError::Transport(format!("failed to create HTTP client: {}", e)))?;

        tracing::info!(host = %config.host, "initialized Ollama transport");

        Ok(Self {
            client,
            host: config.host.clone(),
        })
    }

    /// The configured backend host
    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl ChatTransport for OllamaTransport {
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ByteStream> {
        let url = format!("{}/api/chat", self.host);
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "sending chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| OzetteError::Transport(format!("chat request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(%status, "backend returned error: {}", error_text);
            return Err(OzetteError::Transport(format!(
                "backend returned {}: {}",
                status, error_text
            ))
            .into());
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| OzetteError::Transport(e.to_string()).into()));

        Ok(Box::pin(stream))
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>> {
        let url = format!("{}/api/tags", self.host);
        tracing::debug!(%url, "fetching model list");

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to reach backend for model list");
            OzetteError::Transport(format!("failed to connect to Ollama server: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OzetteError::Transport(format!(
                "backend returned {}: {}",
                status, error_text
            ))
            .into());
        }

        let tags: TagsResponse = response.json().await.map_err(|e| {
            OzetteError::Transport(format!("failed to parse model list: {}", e))
        })?;

        tracing::debug!(count = tags.models.len(), "fetched models");
        Ok(tags.models)
    }
}
