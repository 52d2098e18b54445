//! LINE Messaging API client (reply + push).

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use relay_channels::{Messenger, OutboundMessage, SendError};
use relay_core::config::LINE_API_BASE;

use crate::error::LineError;

const REPLY_PATH: &str = "/v2/bot/message/reply";
const PUSH_PATH: &str = "/v2/bot/message/push";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest<'a> {
    pub reply_token: &'a str,
    pub messages: &'a [OutboundMessage],
}

#[derive(Debug, Serialize)]
pub struct PushRequest<'a> {
    pub to: &'a str,
    pub messages: &'a [OutboundMessage],
}

/// Credential-bearing handle; cheap to share behind an `Arc`.
pub struct LineClient {
    client: reqwest::Client,
    access_token: String,
    api_base: String,
}

impl LineClient {
    pub fn new(access_token: String, api_base: Option<String>) -> Result<Self, LineError> {
        if access_token.trim().is_empty() {
            return Err(LineError::NoToken);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            access_token,
            api_base: api_base
                .unwrap_or_else(|| LINE_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Redeem `reply_token` with up to five messages.
    pub async fn reply_message(
        &self,
        reply_token: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), LineError> {
        self.post(
            REPLY_PATH,
            &ReplyRequest {
                reply_token,
                messages,
            },
        )
        .await
    }

    /// Send up to five messages to `to` (a user, group or room id).
    pub async fn push_message(
        &self,
        to: &str,
        messages: &[OutboundMessage],
    ) -> Result<(), LineError> {
        self.post(PUSH_PATH, &PushRequest { to, messages }).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<(), LineError> {
        let url = format!("{}{}", self.api_base, path);
        debug!(path, "calling LINE API");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(path, status = status.as_u16(), body = %text, "LINE API error");
            return Err(LineError::Api {
                status: status.as_u16(),
                message: text,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for LineClient {
    fn name(&self) -> &str {
        "line"
    }

    async fn reply(&self, reply_handle: &str, text: &str) -> Result<(), SendError> {
        self.reply_message(reply_handle, &[OutboundMessage::text(text)])
            .await
            .map_err(SendError::from)
    }

    async fn push(&self, recipient_id: &str, text: &str) -> Result<(), SendError> {
        self.push_message(recipient_id, &[OutboundMessage::text(text)])
            .await
            .map_err(SendError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_rejected() {
        assert!(matches!(
            LineClient::new("  ".to_string(), None),
            Err(LineError::NoToken)
        ));
    }

    #[test]
    fn api_base_trailing_slash_trimmed() {
        let c = LineClient::new("t".to_string(), Some("http://127.0.0.1:9/".to_string())).unwrap();
        assert_eq!(c.api_base, "http://127.0.0.1:9");
    }

    #[test]
    fn api_errors_map_to_rejected() {
        let e: SendError = LineError::Api {
            status: 400,
            message: "Invalid reply token".to_string(),
        }
        .into();
        assert!(matches!(e, SendError::Rejected { status: 400, .. }));
    }
}
