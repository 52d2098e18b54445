use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use relay_core::RelayError;

use crate::provider::{ChatRequest, LlmProvider};

/// Outcome of composing a reply for one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composed {
    /// Text produced by the completion provider.
    Generated(String),
    /// Completion failed; carries the configured apology text.
    Fallback(String),
}

impl Composed {
    pub fn text(&self) -> &str {
        match self {
            Composed::Generated(t) | Composed::Fallback(t) => t,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Composed::Fallback(_))
    }
}

/// Turns user text into a reply through the configured completion provider.
/// Shared across requests via Arc in AppState.
pub struct ReplyComposer {
    provider: Arc<dyn LlmProvider>,
    persona: String,
    model: String,
    max_tokens: u32,
    fallback_reply: String,
}

impl ReplyComposer {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        persona: String,
        model: String,
        max_tokens: u32,
        fallback_reply: String,
    ) -> Self {
        Self {
            provider,
            persona,
            model,
            max_tokens,
            fallback_reply,
        }
    }

    /// Run one completion: `persona` as system prompt, `user_text` as the
    /// only user turn. Empty output counts as a failure.
    pub async fn complete(&self, persona: &str, user_text: &str) -> Result<String, RelayError> {
        let req = ChatRequest::single_turn(&self.model, persona, user_text, self.max_tokens);
        let started = Instant::now();

        let resp = self.provider.send(&req).await?;

        info!(
            provider = %self.provider.name(),
            model = %resp.model,
            tokens_in = resp.tokens_in,
            tokens_out = resp.tokens_out,
            latency_ms = started.elapsed().as_millis() as u64,
            "completion finished"
        );

        let text = resp.content.trim();
        if text.is_empty() {
            return Err(RelayError::CompletionFailed(format!(
                "provider returned empty content (stop_reason: {})",
                resp.stop_reason
            )));
        }
        Ok(text.to_string())
    }

    /// Compose a reply with the configured persona. Never fails: a completion
    /// error yields [`Composed::Fallback`].
    pub async fn compose(&self, user_text: &str) -> Composed {
        match self.complete(&self.persona, user_text).await {
            Ok(text) => Composed::Generated(text),
            Err(e) => {
                warn!(code = e.code(), error = %e, "completion failed, sending fallback reply");
                Composed::Fallback(self.fallback_reply.clone())
            }
        }
    }
}
