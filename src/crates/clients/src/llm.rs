//! Chat-completion client used by the topic-proposal node.
//!
//! The trait is provider-agnostic; the default implementation speaks the
//! Ollama `/api/chat` wire format. Nodes hold an `Arc<dyn LlmClient>` and
//! never see provider details.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClientError, Result};

/// One chat message in a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role ("system", "user", "assistant").
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a user-role message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-based language model client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send messages to the model and return the assistant's text.
    async fn invoke(&self, messages: Vec<ChatMessage>) -> Result<String>;
}

/// Client for an Ollama-compatible chat endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaClient {
    /// Create a client against the given base URL and model name.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn invoke(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(url = %url, model = %self.model, messages = messages.len(), "Invoking LLM");

        let response = self
            .client
            .post(&url)
            .json(&OllamaChatRequest {
                model: &self.model,
                messages: &messages,
                stream: false,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Api(format!(
                "LLM endpoint returned status {}",
                response.status()
            )));
        }

        let payload: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("malformed chat payload: {}", e)))?;

        if payload.message.content.trim().is_empty() {
            return Err(ClientError::InvalidResponse(
                "chat response contained no content".to_string(),
            ));
        }

        Ok(payload.message.content)
    }
}

/// Mock LLM for offline development and tests.
///
/// Returns a fixed response when configured with one; otherwise derives a
/// topic-proposal JSON from the last user message, which is what the
/// topic-proposal node expects to parse.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    canned: Option<String>,
}

impl MockLlmClient {
    /// Mock that derives its response from the request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that always returns the given response text.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            canned: Some(response.into()),
        }
    }

    fn derive_topic_json(prompt: &str) -> String {
        let title: String = prompt
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(120)
            .collect();
        let slug: String = title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");

        serde_json::json!({
            "title": title,
            "summary": format!("Overview of {}", title),
            "tags": ["draft", "research"],
            "slug": slug,
        })
        .to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn invoke(&self, messages: Vec<ChatMessage>) -> Result<String> {
        if let Some(canned) = &self.canned {
            return Ok(canned.clone());
        }
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("Untitled Topic");
        Ok(Self::derive_topic_json(prompt))
    }
}
