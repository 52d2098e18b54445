use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Webhook signature rejected: {0}")]
    Signature(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Completion failed: {0}")]
    CompletionFailed(String),

    #[error("Reply delivery failed: {0}")]
    ReplyDeliveryFailed(String),

    #[error("Push delivery failed after {delivered_count} push message(s): {reason}")]
    PushDeliveryFailed {
        delivered_count: usize,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Short error code string attached to structured log lines.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::Config(_) => "CONFIG_ERROR",
            RelayError::Signature(_) => "SIGNATURE_REJECTED",
            RelayError::MalformedEvent(_) => "MALFORMED_EVENT",
            RelayError::CompletionFailed(_) => "COMPLETION_FAILED",
            RelayError::ReplyDeliveryFailed(_) => "REPLY_DELIVERY_FAILED",
            RelayError::PushDeliveryFailed { .. } => "PUSH_DELIVERY_FAILED",
            RelayError::Serialization(_) => "SERIALIZATION_ERROR",
            RelayError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
