//! Human-paced multi-message delivery.
//!
//! The first message of a plan redeems the event's single-use reply handle;
//! every later message is pushed to the sender's stable id. Sends are
//! strictly sequential and separated by a randomized pause, and no pause
//! follows the last message.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::messenger::Messenger;
use crate::pacer::{DelayWindow, Pacer};
use crate::types::{DispatchPlan, InboundEvent};

/// Summary of a completed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages submitted, reply included.
    pub sent: usize,
    /// Total time spent pausing between sends.
    pub paused: Duration,
}

pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
    pacer: Arc<dyn Pacer>,
    window: DelayWindow,
    /// Upper bound on the summed pauses of one dispatch.
    max_total_delay: Option<Duration>,
}

impl Dispatcher {
    pub fn new(messenger: Arc<dyn Messenger>, pacer: Arc<dyn Pacer>, window: DelayWindow) -> Self {
        Self {
            messenger,
            pacer,
            window,
            max_total_delay: None,
        }
    }

    pub fn with_max_total_delay(mut self, cap: Option<Duration>) -> Self {
        self.max_total_delay = cap;
        self
    }

    /// Deliver `plan` to the sender of `event`, in order.
    ///
    /// Fails with [`DispatchError::ReplyDeliveryFailed`] (nothing sent) if the
    /// reply handle is rejected, or [`DispatchError::PushDeliveryFailed`] on
    /// the first failed push; no send is attempted after a failure.
    pub async fn dispatch(
        &self,
        event: &InboundEvent,
        plan: &DispatchPlan,
    ) -> Result<DispatchReport, DispatchError> {
        let (first, rest) = plan.split_first();
        let platform = self.messenger.name();

        self.messenger
            .reply(&event.reply_handle, &first.text)
            .await
            .map_err(|e| {
                warn!(platform, recipient = %event.recipient_id, error = %e, "reply send failed");
                DispatchError::ReplyDeliveryFailed(e)
            })?;
        debug!(platform, recipient = %event.recipient_id, index = 0, "reply sent");

        let mut paused = Duration::ZERO;
        for (i, msg) in rest.iter().enumerate() {
            paused += self.pace(paused).await;

            self.messenger
                .push(&event.recipient_id, &msg.text)
                .await
                .map_err(|e| {
                    warn!(
                        platform,
                        recipient = %event.recipient_id,
                        delivered_count = i,
                        error = %e,
                        "push send failed"
                    );
                    DispatchError::PushDeliveryFailed {
                        delivered_count: i,
                        source: e,
                    }
                })?;
            debug!(platform, recipient = %event.recipient_id, index = i + 1, "push sent");
        }

        info!(
            platform,
            recipient = %event.recipient_id,
            sent = plan.len(),
            paused_ms = paused.as_millis() as u64,
            "dispatch complete"
        );

        Ok(DispatchReport {
            sent: plan.len(),
            paused,
        })
    }

    /// Pause before the next send, staying inside the remaining budget.
    async fn pace(&self, spent: Duration) -> Duration {
        let window = match self.max_total_delay {
            Some(cap) => self.window.capped(cap.saturating_sub(spent)),
            None => self.window,
        };
        if window.is_zero() {
            return Duration::ZERO;
        }
        self.pacer.pause(window).await
    }
}
