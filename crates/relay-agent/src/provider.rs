use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single message in the completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Request to an LLM provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    /// Persona, sent as the leading system message.
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

impl ChatRequest {
    /// One-shot request: persona plus a single user turn.
    pub fn single_turn(model: &str, system: &str, user_text: &str, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            system: system.to_string(),
            messages: vec![Message {
                role: Role::User,
                content: user_text.to_string(),
            }],
            max_tokens,
        }
    }
}

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub stop_reason: String,
}

/// Common interface for completion backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging and error messages.
    fn name(&self) -> &str;

    /// Send a chat request, wait for the full response.
    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for relay_core::RelayError {
    fn from(e: ProviderError) -> Self {
        relay_core::RelayError::CompletionFailed(e.to_string())
    }
}
