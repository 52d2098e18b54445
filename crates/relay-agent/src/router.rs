use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, ChatResponse, LlmProvider, ProviderError};

/// Default total wait across all retries of one completion. LINE gives up on
/// a webhook that takes too long, so failover must not stall indefinitely.
pub const DEFAULT_RETRY_BUDGET: Duration = Duration::from_millis(3000);

/// One provider inside the ProviderRouter.
pub struct ProviderSlot {
    pub provider: Box<dyn LlmProvider>,
    /// Extra attempts on this provider before moving to the next one.
    pub max_retries: u32,
}

impl ProviderSlot {
    pub fn new(provider: Box<dyn LlmProvider>, max_retries: u32) -> Self {
        Self {
            provider,
            max_retries,
        }
    }
}

/// Tries completion endpoints in priority order.
///
/// Waits between retries are drawn from one shared budget per request. A
/// `RateLimited` answer is retried on the same endpoint after its
/// `retry_after_ms` if that still fits in the budget; otherwise, or when
/// the budget is spent, the router fails over to the next endpoint at once.
/// 4xx answers are not retried.
pub struct ProviderRouter {
    slots: Vec<ProviderSlot>,
    retry_budget: Duration,
}

impl ProviderRouter {
    /// Returns `None` when `slots` is empty.
    pub fn new(slots: Vec<ProviderSlot>) -> Option<Self> {
        if slots.is_empty() {
            return None;
        }
        Some(Self {
            slots,
            retry_budget: DEFAULT_RETRY_BUDGET,
        })
    }

    pub fn with_retry_budget(mut self, budget: Duration) -> Self {
        self.retry_budget = budget;
        self
    }
}

/// Pause before retrying the same endpoint, or `None` if retrying is pointless.
fn retry_delay(err: &ProviderError, attempt: u32) -> Option<Duration> {
    match err {
        ProviderError::RateLimited { retry_after_ms } => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        ProviderError::Api { status, .. } if (400..500).contains(status) => None,
        _ => Some(Duration::from_millis(250 * (attempt as u64 + 1))),
    }
}

#[async_trait]
impl LlmProvider for ProviderRouter {
    fn name(&self) -> &str {
        "router"
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let mut waited = Duration::ZERO;
        let mut last_err: Option<ProviderError> = None;

        for slot in &self.slots {
            let endpoint = slot.provider.name();
            let mut attempt = 0u32;

            loop {
                let err = match slot.provider.send(req).await {
                    Ok(resp) => return Ok(resp),
                    Err(e) => e,
                };
                warn!(endpoint, attempt, error = %err, "completion attempt failed");

                let delay = if attempt < slot.max_retries {
                    retry_delay(&err, attempt)
                } else {
                    None
                };
                last_err = Some(err);

                match delay {
                    Some(d) if waited + d <= self.retry_budget => {
                        tokio::time::sleep(d).await;
                        waited += d;
                        attempt += 1;
                    }
                    Some(d) => {
                        debug!(
                            endpoint,
                            wait_ms = d.as_millis() as u64,
                            waited_ms = waited.as_millis() as u64,
                            "retry would exceed budget"
                        );
                        break;
                    }
                    None => break,
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| ProviderError::Unavailable("no completion endpoint".to_string())))
    }
}
