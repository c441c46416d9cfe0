// courier-core/src/completion.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::config::CompletionConfig;
use crate::errors::CompletionError;
use crate::models::chat::ChatMessage;

/// A text-completion backend: role-tagged messages in, assistant text out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Client for a local Ollama server's `/api/chat` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    http_client: Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaClient {
    pub fn new(http_client: Client, config: &CompletionConfig) -> Self {
        debug!(model = %config.model, base_url = %config.base_url, "Creating Ollama client.");
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn chat_endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn build_payload(&self, messages: &[ChatMessage]) -> Value {
        json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.temperature
            }
        })
    }

    /// Checks that the server answers on `/api/tags`.
    pub async fn probe(&self) -> Result<(), CompletionError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(CompletionError::Unreachable)?;
        let status = response.status();
        if status.is_success() {
            debug!(%url, "Ollama is reachable.");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(CompletionError::BadStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl CompletionService for OllamaClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let endpoint = self.chat_endpoint();
        let payload = self.build_payload(messages);
        debug!(%endpoint, num_messages = messages.len(), "Sending request to Ollama.");
        trace!(payload = %payload, "Ollama request payload");

        let response = self
            .http_client
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(CompletionError::Unreachable)?;

        let status = response.status();
        let body = response.text().await.map_err(CompletionError::Unreachable)?;
        if !status.is_success() {
            debug!(status = status.as_u16(), %body, "Ollama request failed.");
            return Err(CompletionError::BadStatus {
                status: status.as_u16(),
                body,
            });
        }

        trace!(response = %body, "Ollama response body");
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::MalformedResponse(format!("{}: {}", e, body)))?;
        Ok(parsed.message.content)
    }
}
