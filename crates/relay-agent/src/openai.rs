use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

const DEFAULT_CHAT_PATH: &str = "/v1/chat/completions";

/// OpenAI chat completions, or any endpoint speaking the same dialect.
pub struct OpenAiProvider {
    client: reqwest::Client,
    name: String,
    api_key: String,
    base_url: String,
    chat_path: String,
    /// Replaces `ChatRequest::model` when set.
    model_override: Option<String>,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: "openai".to_string(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://api.openai.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            model_override: None,
        }
    }

    /// An OpenAI-compatible endpoint with its own label and path.
    pub fn with_path(
        name: String,
        api_key: String,
        base_url: String,
        chat_path: Option<String>,
        model_override: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            name,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_path: chat_path.unwrap_or_else(|| DEFAULT_CHAT_PATH.to_string()),
            model_override,
        }
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url, self.chat_path)
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let model = self.model_override.as_deref().unwrap_or(&req.model);
        let body = build_request_body(req, model);

        debug!(provider = %self.name, model = %model, "sending completion request");

        let resp = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .map(parse_retry_after_ms)
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %text, "completion API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_response(api_resp)
    }
}

/// `retry-after` is in seconds; unparseable values fall back to 5s.
fn parse_retry_after_ms(value: &str) -> u64 {
    value
        .trim()
        .parse::<u64>()
        .map(|s| s * 1000)
        .unwrap_or(5000)
}

fn build_request_body(req: &ChatRequest, model: &str) -> serde_json::Value {
    // System persona goes first as its own message.
    let mut messages = vec![serde_json::json!({
        "role": "system",
        "content": req.system,
    })];

    for m in &req.messages {
        messages.push(serde_json::json!({
            "role": m.role,
            "content": m.content,
        }));
    }

    serde_json::json!({
        "model": model,
        "messages": messages,
        "max_tokens": req.max_tokens,
    })
}

fn parse_response(resp: ApiResponse) -> Result<ChatResponse, ProviderError> {
    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response has no choices".to_string()))?;

    let content = choice.message.content.unwrap_or_default();
    let stop_reason = choice.finish_reason.unwrap_or_default();

    Ok(ChatResponse {
        content,
        model: resp.model,
        tokens_in: resp.usage.as_ref().map(|u| u.prompt_tokens).unwrap_or(0),
        tokens_out: resp
            .usage
            .as_ref()
            .map(|u| u.completion_tokens)
            .unwrap_or(0),
        stop_reason,
    })
}

// Chat completions response types (deserialization only)

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest::single_turn("gpt-4o-mini", "You are a shop assistant.", "hello", 256)
    }

    #[test]
    fn body_puts_persona_first() {
        let body = build_request_body(&request(), "gpt-4o-mini");
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "You are a shop assistant.");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "hello");
        assert_eq!(body["max_tokens"], 256);
    }

    #[test]
    fn body_uses_given_model() {
        let body = build_request_body(&request(), "llama-3.1-8b");
        assert_eq!(body["model"], "llama-3.1-8b");
    }

    #[test]
    fn parses_first_choice() {
        let raw = r#"{
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [
                {"message": {"role": "assistant", "content": "สวัสดีค่ะ"}, "finish_reason": "stop"},
                {"message": {"role": "assistant", "content": "ignored"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let resp = parse_response(parsed).unwrap();
        assert_eq!(resp.content, "สวัสดีค่ะ");
        assert_eq!(resp.tokens_in, 12);
        assert_eq!(resp.tokens_out, 4);
        assert_eq!(resp.stop_reason, "stop");
    }

    #[test]
    fn null_content_becomes_empty() {
        let raw = r#"{"model": "m", "choices": [{"message": {"content": null}, "finish_reason": null}]}"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        let resp = parse_response(parsed).unwrap();
        assert!(resp.content.is_empty());
        assert_eq!(resp.tokens_in, 0);
    }

    #[test]
    fn no_choices_is_parse_error() {
        let raw = r#"{"model": "m", "choices": []}"#;
        let parsed: ApiResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(parse_response(parsed), Err(ProviderError::Parse(_))));
    }

    #[test]
    fn retry_after_seconds_to_ms() {
        assert_eq!(parse_retry_after_ms("3"), 3000);
        assert_eq!(parse_retry_after_ms("soon"), 5000);
    }

    #[test]
    fn compat_provider_url_joins_path() {
        let p = OpenAiProvider::with_path(
            "groq".to_string(),
            "k".to_string(),
            "https://api.groq.com/openai/".to_string(),
            None,
            None,
        );
        assert_eq!(p.url(), "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(p.name(), "groq");
    }
}
