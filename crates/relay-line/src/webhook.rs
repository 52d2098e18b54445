//! LINE webhook payload model.
//!
//! Only the fields the relay reads are modelled; everything else in the
//! payload is ignored. Unknown event and message types still deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relay_channels::InboundEvent;
use relay_core::RelayError;

/// Body of a webhook notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    /// Bot user id the notification is addressed to.
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    /// `"active"` or `"standby"`; standby channels must not reply.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub webhook_event_id: Option<String>,
    #[serde(default)]
    pub delivery_context: Option<DeliveryContext>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl EventSource {
    /// Chat that follow-up push messages go to: the group, the room, or the
    /// user for one-to-one chats.
    pub fn push_target(&self) -> Option<&str> {
        let id = match self.source_type.as_str() {
            "group" => self.group_id.as_deref(),
            "room" => self.room_id.as_deref(),
            _ => self.user_id.as_deref(),
        };
        id.filter(|id| !id.is_empty())
    }

    fn push_target_field(&self) -> &'static str {
        match self.source_type.as_str() {
            "group" => "source.groupId",
            "room" => "source.roomId",
            _ => "source.userId",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryContext {
    #[serde(default)]
    pub is_redelivery: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// What the relay should do with one webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// A text message to answer.
    Text(InboundEvent),
    /// Anything else (follow, sticker, image, standby, ...).
    Ignored(String),
}

impl WebhookPayload {
    pub fn from_slice(body: &[u8]) -> Result<Self, RelayError> {
        Ok(serde_json::from_slice(body)?)
    }
}

impl WebhookEvent {
    /// Sort the event into text-to-answer or ignore.
    ///
    /// A text message without a reply token, push address or text is
    /// `MalformedEvent`. The push address is the group or room for group and
    /// room chats, so follow-up messages land in the same conversation.
    pub fn classify(&self) -> Result<Classified, RelayError> {
        if self.event_type != "message" {
            return Ok(Classified::Ignored(format!("event type {}", self.event_type)));
        }
        let message = match &self.message {
            Some(m) if m.message_type == "text" => m,
            Some(m) => {
                return Ok(Classified::Ignored(format!(
                    "message type {}",
                    m.message_type
                )))
            }
            None => {
                return Err(RelayError::MalformedEvent(
                    "message event without message object".to_string(),
                ))
            }
        };
        if self.mode.as_deref() == Some("standby") {
            return Ok(Classified::Ignored("channel in standby mode".to_string()));
        }

        let reply_handle = self
            .reply_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| self.malformed("replyToken"))?;
        let source = self.source.as_ref().ok_or_else(|| self.malformed("source"))?;
        let recipient_id = source
            .push_target()
            .map(str::to_string)
            .ok_or_else(|| self.malformed(source.push_target_field()))?;
        let text = message
            .text
            .clone()
            .ok_or_else(|| self.malformed("message.text"))?;

        Ok(Classified::Text(InboundEvent {
            reply_handle,
            recipient_id,
            message_text: Some(text),
            delivery_id: self.webhook_event_id.clone(),
            is_redelivery: self.is_redelivery(),
        }))
    }

    pub fn is_redelivery(&self) -> bool {
        self.delivery_context
            .as_ref()
            .map(|c| c.is_redelivery)
            .unwrap_or(false)
    }

    /// When the user sent the event.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }

    fn malformed(&self, field: &str) -> RelayError {
        RelayError::MalformedEvent(format!(
            "text message {} is missing {}",
            self.webhook_event_id.as_deref().unwrap_or("<no id>"),
            field
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> WebhookEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn text_message_becomes_inbound_event() {
        let ev = parse(
            r#"{
                "type": "message",
                "mode": "active",
                "timestamp": 1700000000000,
                "webhookEventId": "01HABCDEF",
                "deliveryContext": {"isRedelivery": true},
                "replyToken": "rt-1",
                "source": {"type": "user", "userId": "U1"},
                "message": {"id": "m1", "type": "text", "text": "hello"}
            }"#,
        );
        match ev.classify().unwrap() {
            Classified::Text(inbound) => {
                assert_eq!(inbound.reply_handle, "rt-1");
                assert_eq!(inbound.recipient_id, "U1");
                assert_eq!(inbound.message_text.as_deref(), Some("hello"));
                assert_eq!(inbound.delivery_id.as_deref(), Some("01HABCDEF"));
                assert!(inbound.is_redelivery);
            }
            other => panic!("expected text, got {other:?}"),
        }
        assert_eq!(ev.sent_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn sticker_is_ignored() {
        let ev = parse(
            r#"{"type": "message", "replyToken": "rt", "source": {"type": "user", "userId": "U1"},
                "message": {"id": "m", "type": "sticker", "packageId": "1", "stickerId": "2"}}"#,
        );
        assert!(matches!(ev.classify().unwrap(), Classified::Ignored(_)));
    }

    #[test]
    fn follow_event_is_ignored() {
        let ev = parse(r#"{"type": "follow", "replyToken": "rt", "source": {"type": "user", "userId": "U1"}}"#);
        assert_eq!(
            ev.classify().unwrap(),
            Classified::Ignored("event type follow".to_string())
        );
    }

    #[test]
    fn standby_text_is_ignored() {
        let ev = parse(
            r#"{"type": "message", "mode": "standby", "source": {"type": "user", "userId": "U1"},
                "message": {"id": "m", "type": "text", "text": "hi"}}"#,
        );
        assert!(matches!(ev.classify().unwrap(), Classified::Ignored(_)));
    }

    fn recipient_of(source: &str) -> String {
        let ev = parse(&format!(
            r#"{{"type": "message", "replyToken": "rt", "source": {source},
                "message": {{"id": "m", "type": "text", "text": "hi"}}}}"#
        ));
        match ev.classify().unwrap() {
            Classified::Text(inbound) => inbound.recipient_id,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn group_text_pushes_to_group() {
        let to = recipient_of(r#"{"type": "group", "groupId": "Cgroup", "userId": "Uuser"}"#);
        assert_eq!(to, "Cgroup");
    }

    #[test]
    fn group_text_without_member_id_is_answered() {
        assert_eq!(recipient_of(r#"{"type": "group", "groupId": "Cgroup"}"#), "Cgroup");
    }

    #[test]
    fn room_text_pushes_to_room() {
        let to = recipient_of(r#"{"type": "room", "roomId": "Rroom", "userId": "Uuser"}"#);
        assert_eq!(to, "Rroom");
    }

    #[test]
    fn group_text_without_group_id_is_malformed() {
        let ev = parse(
            r#"{"type": "message", "replyToken": "rt", "source": {"type": "group", "userId": "U1"},
                "message": {"id": "m", "type": "text", "text": "hi"}}"#,
        );
        let err = ev.classify().unwrap_err();
        assert_eq!(err.code(), "MALFORMED_EVENT");
        assert!(err.to_string().contains("source.groupId"));
    }

    #[test]
    fn text_without_user_id_is_malformed() {
        let ev = parse(
            r#"{"type": "message", "replyToken": "rt", "source": {"type": "user"},
                "message": {"id": "m", "type": "text", "text": "hi"}}"#,
        );
        let err = ev.classify().unwrap_err();
        assert_eq!(err.code(), "MALFORMED_EVENT");
        assert!(err.to_string().contains("source.userId"));
    }

    #[test]
    fn text_without_reply_token_is_malformed() {
        let ev = parse(
            r#"{"type": "message", "source": {"type": "user", "userId": "U1"},
                "message": {"id": "m", "type": "text", "text": "hi"}}"#,
        );
        assert!(ev.classify().unwrap_err().to_string().contains("replyToken"));
    }
}
