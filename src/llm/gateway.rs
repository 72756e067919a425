//! Provider gateway: streaming chat completions over OpenAI-compatible HTTP.
//!
//! The gateway is stateless: a pure function of (provider, optional model)
//! to an HTTP call. Transport and upstream failures during streaming never
//! escape the gateway; they are downgraded to a final human-readable fragment
//! so the caller always has something to display and persist.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::config::Config;
use crate::llm::{
    errors::{LlmError, LlmResult},
    provider::{Provider, ProviderEndpoint, MODEL_LIST_FALLBACK},
    types::{ChatMessage, TokenStream},
};

/// Fixed instruction prepended to every outbound history.
pub const SYSTEM_PROMPT: &str = "You are a helpful and friendly assistant.";

/// Seam between the session layer and the provider HTTP stack.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Open a streaming chat completion for the given history and return the
    /// fragment sequence. The sequence is finite and non-restartable; errors
    /// are embedded as a trailing error-text fragment, never raised.
    fn stream_response(
        &self,
        history: Vec<ChatMessage>,
        provider: Provider,
        explicit_model: Option<String>,
    ) -> TokenStream;

    /// List models available for the provider.
    ///
    /// Model discovery must never block session start: any failure yields the
    /// fixed fallback list instead of an error.
    async fn list_models(&self, provider: Provider) -> Vec<String>;
}

/// HTTP-backed gateway over the closed provider set.
pub struct ProviderGateway {
    client: Client,
    config: Config,
}

impl ProviderGateway {
    /// Timeout semantics are deferred to the client defaults; a global
    /// deadline would cut off long generations mid-stream.
    pub fn new(config: Config) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn fetch_local_tags(&self, endpoint: &ProviderEndpoint) -> LlmResult<Vec<String>> {
        let url = endpoint.tags_url();
        debug!(%url, "fetching local model registry");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LlmError::Api(format!(
                "failed to fetch models: {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl CompletionBackend for ProviderGateway {
    fn stream_response(
        &self,
        history: Vec<ChatMessage>,
        provider: Provider,
        explicit_model: Option<String>,
    ) -> TokenStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let endpoint = provider.endpoint(&self.config);

        tokio::spawn(async move {
            let result = match endpoint {
                Ok(endpoint) => {
                    let model = explicit_model
                        .filter(|m| !m.trim().is_empty())
                        .unwrap_or_else(|| provider.default_model().to_string());
                    pump_stream(&client, &endpoint, &model, history, &tx).await
                }
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                warn!(provider = %provider, error = %e, "stream failed, emitting inline error");
                let _ = tx.send(format!("\n\nError connecting to {provider}: {e}"));
            }
        });

        Box::pin(UnboundedReceiverStream::new(rx))
    }

    async fn list_models(&self, provider: Provider) -> Vec<String> {
        // Only the local provider exposes a registry; hosted providers just
        // report their default model.
        if provider != Provider::Ollama {
            return vec![provider.default_model().to_string()];
        }

        let endpoint = match provider.endpoint(&self.config) {
            Ok(endpoint) => endpoint,
            Err(_) => return fallback_models(),
        };

        match self.fetch_local_tags(&endpoint).await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => fallback_models(),
            Err(e) => {
                warn!(error = %e, "model registry unreachable, using fallback list");
                fallback_models()
            }
        }
    }
}

fn fallback_models() -> Vec<String> {
    MODEL_LIST_FALLBACK.iter().map(|m| m.to_string()).collect()
}

/// Drive one streaming completion, forwarding content deltas into `tx`.
///
/// Returns `Ok(())` both on normal completion and when the receiver goes away
/// (the session disconnected); in the latter case the upstream response is
/// dropped and no further chunks are consumed.
async fn pump_stream(
    client: &Client,
    endpoint: &ProviderEndpoint,
    model: &str,
    history: Vec<ChatMessage>,
    tx: &mpsc::UnboundedSender<String>,
) -> LlmResult<()> {
    let mut messages = vec![ChatMessage::new_system(SYSTEM_PROMPT)];
    messages.extend(history);

    let body = json!({
        "model": model,
        "messages": messages,
        "stream": true,
    });

    let response = client
        .post(endpoint.chat_completions_url())
        .bearer_auth(&endpoint.api_key)
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let detail = response.text().await.unwrap_or_default();
        return Err(LlmError::Api(format!("{status}: {detail}")));
    }

    let mut buffer = String::new();
    let mut chunks = response.bytes_stream();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        // SSE events are newline-delimited; a chunk may split one mid-line.
        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim().to_string();
            buffer.drain(..=pos);

            match parse_sse_line(&line) {
                Some(SseEvent::Delta(delta)) => {
                    if tx.send(delta).is_err() {
                        return Ok(());
                    }
                }
                Some(SseEvent::Done) => return Ok(()),
                None => {}
            }
        }
    }

    Ok(())
}

enum SseEvent {
    Delta(String),
    Done,
}

fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data: ")?;
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }

    let parsed: StreamResponse = serde_json::from_str(data).ok()?;
    let delta = parsed.choices.into_iter().next()?.delta?.content?;
    if delta.is_empty() {
        None
    } else {
        Some(SseEvent::Delta(delta))
    }
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
