use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    routing::{get, post},
    Router,
};
use relay_agent::ReplyComposer;
use relay_channels::{Dispatcher, PlanBuilder};
use relay_core::config::RelayConfig;

use crate::dedup::DeliveryDedup;

/// Central shared state, shared as Arc<AppState> by all Axum handlers.
pub struct AppState {
    pub config: RelayConfig,
    pub composer: ReplyComposer,
    pub planner: PlanBuilder,
    pub dispatcher: Dispatcher,
    /// webhookEventIds already handled, for redelivery suppression.
    pub dedup: DeliveryDedup,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: RelayConfig, composer: ReplyComposer, dispatcher: Dispatcher) -> Self {
        let planner = PlanBuilder::from_config(&config.dispatch);
        let dedup = DeliveryDedup::new(Duration::from_secs(config.dispatch.dedup_ttl_secs));
        Self {
            config,
            composer,
            planner,
            dispatcher,
            dedup,
            started_at: Instant::now(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let webhook_path = state.config.gateway.webhook_path.clone();
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route(&webhook_path, post(crate::http::webhook::webhook_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
