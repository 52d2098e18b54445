use serde::{Deserialize, Serialize};

/// One user message lifted out of a webhook notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Single-use token; redeemable for exactly one reply.
    pub reply_handle: String,

    /// Push address of the conversation (user, group or room id), used for
    /// every send after the first.
    pub recipient_id: String,

    /// The user's text. `None` for anything that is not a text message.
    pub message_text: Option<String>,

    /// Platform delivery id, stable across redeliveries of the same event.
    pub delivery_id: Option<String>,

    /// Set by the platform when this is a retry of an earlier delivery.
    pub is_redelivery: bool,
}

/// A single text message to deliver. Serializes as `{"type":"text","text":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "text")]
pub struct OutboundMessage {
    pub text: String,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Ordered, non-empty list of messages for one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    first: OutboundMessage,
    rest: Vec<OutboundMessage>,
}

impl DispatchPlan {
    /// Returns `None` for an empty sequence.
    pub fn new<I, S>(bodies: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut iter = bodies.into_iter().map(OutboundMessage::text);
        let first = iter.next()?;
        Some(Self {
            first,
            rest: iter.collect(),
        })
    }

    /// The message that redeems the reply handle, and everything after it.
    pub fn split_first(&self) -> (&OutboundMessage, &[OutboundMessage]) {
        (&self.first, &self.rest)
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    /// Always false.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutboundMessage> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|m| m.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_plan_is_rejected() {
        assert!(DispatchPlan::new(Vec::<String>::new()).is_none());
    }

    #[test]
    fn plan_preserves_order() {
        let plan = DispatchPlan::new(["a", "b", "c"]).unwrap();
        let (first, rest) = plan.split_first();
        assert_eq!(first.text, "a");
        assert_eq!(rest.len(), 2);
        assert_eq!(plan.texts().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn outbound_message_wire_shape() {
        let json = serde_json::to_value(OutboundMessage::text("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "text": "hi"}));
    }
}
