use thiserror::Error;

use relay_core::RelayError;

/// A single send rejected by the messaging platform or lost in transit.
#[derive(Debug, Error)]
pub enum SendError {
    /// The platform answered with a non-success status.
    #[error("rejected by platform ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never got a usable answer.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Why a dispatch stopped before every message was submitted.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The reply handle could not be redeemed; nothing was sent.
    #[error("reply delivery failed: {0}")]
    ReplyDeliveryFailed(#[source] SendError),

    /// A push failed. `delivered_count` push sends succeeded before it, in
    /// addition to the reply.
    #[error("push delivery failed after {delivered_count} push message(s): {source}")]
    PushDeliveryFailed {
        delivered_count: usize,
        #[source]
        source: SendError,
    },
}

impl DispatchError {
    /// Total messages the user received, reply included.
    pub fn messages_delivered(&self) -> usize {
        match self {
            DispatchError::ReplyDeliveryFailed(_) => 0,
            DispatchError::PushDeliveryFailed {
                delivered_count, ..
            } => delivered_count + 1,
        }
    }
}

impl From<DispatchError> for RelayError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::ReplyDeliveryFailed(source) => {
                RelayError::ReplyDeliveryFailed(source.to_string())
            }
            DispatchError::PushDeliveryFailed {
                delivered_count,
                source,
            } => RelayError::PushDeliveryFailed {
                delivered_count,
                reason: source.to_string(),
            },
        }
    }
}
