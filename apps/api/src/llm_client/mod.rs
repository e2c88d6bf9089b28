//! LLM Client — the single point of entry for calls to the local chat-completion endpoint.
//!
//! One POST per call: no retries, no streaming, and no timeout beyond the HTTP client default.
//! The endpoint, model, and sampling settings arrive through `CompletionConfig` so tests can
//! point the client at a stub server.

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

/// Ollama's OpenAI-compatible chat endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama3.1:latest";
const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f32 = 0.5;

/// Every variant renders with this prefix so callers that only see the
/// message can still tell a failure from model output.
pub const ERROR_MARKER: &str = "Error";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Error calling local LLM API: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error calling local LLM API (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Error parsing local LLM response: {0}")]
    Parse(#[from] serde_json::Error),
}

impl LlmError {
    /// Short description for end users; upstream bodies stay in the logs.
    pub fn user_message(&self) -> String {
        let detail = match self {
            LlmError::Http(e) if e.is_connect() => ": endpoint unreachable".to_string(),
            LlmError::Http(e) if e.is_timeout() => ": request timed out".to_string(),
            LlmError::Http(_) => ": request failed".to_string(),
            LlmError::Api { status, .. } => format!(" (status {status})"),
            LlmError::Parse(_) => return format!("{ERROR_MARKER} parsing local LLM response"),
        };
        format!("{ERROR_MARKER} calling local LLM API{detail}")
    }
}

/// Settings for the completion endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// `choices[0].message.content` of a chat completion body, trimmed. Any other
/// shape (missing keys, `null`, wrong types) yields empty content.
pub fn reply_text(body: &Value) -> &str {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: CompletionConfig,
}

impl LlmClient {
    pub fn new(config: CompletionConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().build()?,
            config,
        })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Sends `prompt` as a single user message and returns the assistant reply.
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let request_body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!("Local LLM API call failed: {e}");
                LlmError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Local LLM API returned {status}: {body}");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let parsed: Value = serde_json::from_str(&body)?;
        let text = reply_text(&parsed);

        debug!(
            "LLM call succeeded: model={}, {} chars returned",
            self.config.model,
            text.len()
        );

        Ok(text.to_string())
    }
}
