use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use relay_agent::openai::OpenAiProvider;
use relay_agent::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};
use relay_agent::router::{ProviderRouter, ProviderSlot};
use relay_core::config::RelayConfig;

/// Build the completion provider chain from config.
///
/// Priority order:
///   1. providers.openai
///   2. providers.openai_compat[*]  (in declaration order)
///
/// `OPENAI_API_KEY` has already been folded into `providers.openai` by
/// `RelayConfig::apply_env_fallbacks`. With several slots a ProviderRouter
/// fails over between them.
pub fn build_provider(config: &RelayConfig) -> Arc<dyn LlmProvider> {
    let mut slots: Vec<ProviderSlot> = Vec::new();

    if let Some(ref openai) = config.providers.openai {
        info!("LLM provider slot[{}]: OpenAI ({})", slots.len(), openai.base_url);
        slots.push(ProviderSlot::new(
            Box::new(OpenAiProvider::new(
                openai.api_key.clone(),
                Some(openai.base_url.clone()),
            )),
            1,
        ));
    }

    for entry in &config.providers.openai_compat {
        info!(
            "LLM provider slot[{}]: {} ({}{})",
            slots.len(),
            entry.id,
            entry.base_url,
            entry.chat_path.as_deref().unwrap_or("/v1/chat/completions")
        );
        slots.push(ProviderSlot::new(
            Box::new(OpenAiProvider::with_path(
                entry.id.clone(),
                entry.api_key.clone(),
                entry.base_url.clone(),
                entry.chat_path.clone(),
                entry.model.clone(),
            )),
            1,
        ));
    }

    match slots.len() {
        0 => {
            warn!("No LLM provider configured; every reply will be the fallback message");
            Arc::new(NullProvider)
        }
        1 => Arc::from(slots.remove(0).provider),
        n => {
            info!(
                "ProviderRouter: {} slots, retry budget {}ms",
                n, config.agent.retry_budget_ms
            );
            let budget = Duration::from_millis(config.agent.retry_budget_ms);
            match ProviderRouter::new(slots) {
                Some(router) => Arc::new(router.with_retry_budget(budget)),
                None => Arc::new(NullProvider),
            }
        }
    }
}

/// Placeholder provider when no API key is available.
struct NullProvider;

#[async_trait::async_trait]
impl LlmProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }
    async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        Err(ProviderError::Unavailable(
            "no LLM provider configured; set providers.openai.api_key or OPENAI_API_KEY".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::config::{OpenAiCompatEntry, OpenAiProviderConfig};

    #[test]
    fn no_provider_yields_null() {
        let provider = build_provider(&RelayConfig::default());
        assert_eq!(provider.name(), "null");
    }

    #[test]
    fn single_openai_is_used_directly() {
        let mut config = RelayConfig::default();
        config.providers.openai = Some(OpenAiProviderConfig {
            api_key: "sk".to_string(),
            base_url: "https://api.openai.com".to_string(),
        });
        assert_eq!(build_provider(&config).name(), "openai");
    }

    #[test]
    fn several_providers_use_router() {
        let mut config = RelayConfig::default();
        config.providers.openai = Some(OpenAiProviderConfig {
            api_key: "sk".to_string(),
            base_url: "https://api.openai.com".to_string(),
        });
        config.providers.openai_compat.push(OpenAiCompatEntry {
            id: "groq".to_string(),
            api_key: "gsk".to_string(),
            base_url: "https://api.groq.com/openai".to_string(),
            chat_path: None,
            model: Some("llama-3.1-8b-instant".to_string()),
        });
        assert_eq!(build_provider(&config).name(), "router");
    }

    #[tokio::test]
    async fn null_provider_errors() {
        let provider = build_provider(&RelayConfig::default());
        let req = ChatRequest::single_turn("m", "p", "hi", 8);
        assert!(matches!(
            provider.send(&req).await,
            Err(ProviderError::Unavailable(_))
        ));
    }
}
