use async_trait::async_trait;

use crate::error::SendError;

/// The two delivery primitives a chat platform offers a bot.
///
/// Implementations are long-lived and credential-bearing; every call is
/// addressed explicitly, so one instance is shared across concurrent events
/// without locking.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Platform name for logs (e.g. `"line"`).
    fn name(&self) -> &str;

    /// Redeem a single-use reply handle with one message.
    async fn reply(&self, reply_handle: &str, text: &str) -> Result<(), SendError>;

    /// Send one message to a recipient by stable id. Repeatable.
    async fn push(&self, recipient_id: &str, text: &str) -> Result<(), SendError>;
}
