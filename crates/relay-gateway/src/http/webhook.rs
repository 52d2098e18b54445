//! LINE webhook endpoint: POST /webhook (path configurable).
//!
//! Verifies `x-line-signature`, then walks the notification's events in
//! order: text messages are composed into a reply and dispatched, everything
//! else is skipped. Answers 200 when every event was handled and 500 when
//! any failed, which makes LINE redeliver the notification later.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use relay_channels::DispatchError;
use relay_core::RelayError;
use relay_line::signature::{self, SIGNATURE_HEADER};
use relay_line::{Classified, WebhookEvent, WebhookPayload};

use crate::app::AppState;

/// How one event ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventOutcome {
    Answered { fallback: bool },
    Ignored,
    Duplicate,
}

#[derive(Debug, Default)]
struct Summary {
    answered: usize,
    fallbacks: usize,
    ignored: usize,
    duplicates: usize,
    failed: usize,
}

type HandlerError = (StatusCode, Json<Value>);

/// POST handler for LINE webhook notifications.
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, HandlerError> {
    let receipt_id = uuid::Uuid::new_v4().to_string();

    if let Some(secret) = state.config.line.channel_secret.as_deref() {
        let sig = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| signature_error("missing x-line-signature header"))?;
        signature::verify(secret, &body, sig).map_err(|e| signature_error(&e.to_string()))?;
    }

    let payload = WebhookPayload::from_slice(&body).map_err(|e| {
        warn!(receipt_id = %receipt_id, error = %e, "invalid JSON in webhook body");
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid JSON body"})),
        )
    })?;

    if payload.events.is_empty() {
        debug!(receipt_id = %receipt_id, "webhook with no events (verification ping)");
        return Ok(Json(json!({"ok": true, "receipt_id": receipt_id, "answered": 0})));
    }

    info!(receipt_id = %receipt_id, events = payload.events.len(), "webhook received");

    let mut summary = Summary::default();
    let mut first_error: Option<RelayError> = None;

    // Sequential on purpose: later events from the same user must not
    // overtake earlier ones.
    for event in &payload.events {
        match process_event(&state, event).await {
            Ok(EventOutcome::Answered { fallback }) => {
                summary.answered += 1;
                if fallback {
                    summary.fallbacks += 1;
                }
            }
            Ok(EventOutcome::Ignored) => summary.ignored += 1,
            Ok(EventOutcome::Duplicate) => summary.duplicates += 1,
            Err(e) => {
                error!(
                    receipt_id = %receipt_id,
                    event_id = event.webhook_event_id.as_deref().unwrap_or(""),
                    code = e.code(),
                    error = %e,
                    "event handling failed"
                );
                summary.failed += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    info!(
        receipt_id = %receipt_id,
        answered = summary.answered,
        fallbacks = summary.fallbacks,
        ignored = summary.ignored,
        duplicates = summary.duplicates,
        failed = summary.failed,
        "webhook processed"
    );

    if let Some(e) = first_error {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "internal error", "code": e.code(), "receipt_id": receipt_id})),
        ));
    }

    Ok(Json(json!({
        "ok": true,
        "receipt_id": receipt_id,
        "answered": summary.answered,
        "fallbacks": summary.fallbacks,
        "ignored": summary.ignored,
        "duplicates": summary.duplicates,
    })))
}

/// Classify → dedup → compose → plan → dispatch for a single event.
async fn process_event(state: &AppState, event: &WebhookEvent) -> Result<EventOutcome, RelayError> {
    let inbound = match event.classify()? {
        Classified::Text(inbound) => inbound,
        Classified::Ignored(reason) => {
            debug!(reason = %reason, "event ignored");
            return Ok(EventOutcome::Ignored);
        }
    };

    if let Some(id) = inbound.delivery_id.as_deref() {
        if !state.dedup.claim(id) {
            info!(event_id = id, redelivery = inbound.is_redelivery, "duplicate event skipped");
            return Ok(EventOutcome::Duplicate);
        }
    }

    let text = inbound.message_text.as_deref().unwrap_or_default();
    debug!(recipient = %inbound.recipient_id, text = %text, "user message");
    if let Some(sent_at) = event.sent_at() {
        debug!(sent_at = %sent_at, redelivery = inbound.is_redelivery, "event timing");
    }

    let composed = state.composer.compose(text).await;
    let fallback = composed.is_fallback();

    let plan = state.planner.build(composed.text()).ok_or_else(|| {
        release(state, inbound.delivery_id.as_deref());
        RelayError::Internal("composed reply produced an empty dispatch plan".to_string())
    })?;

    match state.dispatcher.dispatch(&inbound, &plan).await {
        Ok(_) => Ok(EventOutcome::Answered { fallback }),
        Err(e) => {
            // Nothing reached the user, so a redelivery may try again.
            if matches!(e, DispatchError::ReplyDeliveryFailed(_)) {
                release(state, inbound.delivery_id.as_deref());
            }
            Err(e.into())
        }
    }
}

fn release(state: &AppState, delivery_id: Option<&str>) {
    if let Some(id) = delivery_id {
        state.dedup.release(id);
    }
}

fn signature_error(reason: &str) -> HandlerError {
    warn!(reason = %reason, "webhook signature check failed");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "invalid signature"})),
    )
}
