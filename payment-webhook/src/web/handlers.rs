//! Webhook endpoint handlers.
//!
//! The Razorpay handler:
//! 1. Verifies the body signature before looking at the payload
//! 2. Decodes and classifies the event
//! 3. Applies at most one order update
//! 4. Acknowledges with 200 for every business outcome

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::event::parse_event;
use crate::process::{process_event, Outcome};
use crate::store::DocumentStore;
use crate::web::error::WebhookError;
use crate::web::signature::{verify_razorpay_signature, SIGNATURE_HEADER};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Acknowledgement body shared by the health check and the webhook.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { status: "ok" })
    }
}

/// Health check endpoint.
pub async fn health() -> Json<StatusResponse> {
    StatusResponse::ok()
}

// =============================================================================
// Razorpay Webhook
// =============================================================================

/// Razorpay payment webhook endpoint.
///
/// Takes the body as raw bytes: the signature covers the exact bytes sent,
/// so nothing may be decoded before verification.
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<StatusResponse>, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    info!(
        body_length = body.len(),
        has_signature = signature.is_some(),
        "razorpay_webhook_received"
    );

    if !verify_razorpay_signature(&state.config.razorpay_webhook_secret, &body, signature) {
        return Err(WebhookError::InvalidSignature);
    }

    let event = parse_event(&body).map_err(|e| {
        warn!(error = %e, "razorpay_payload_malformed");
        WebhookError::from(e)
    })?;

    match process_event(state.store.as_ref(), &state.config.orders_collection, event).await {
        Ok(Outcome::OrderPaid { order_id, payment_id }) => {
            info!(order_id = %order_id, payment_id = %payment_id, "razorpay_webhook_applied");
        }
        Ok(Outcome::MissingOrderId { payment_id }) => {
            info!(payment_id = %payment_id, "razorpay_webhook_no_order");
        }
        // Already logged during classification
        Ok(Outcome::Ignored { .. }) => {}
        Err(e) if !e.is_transient() => {
            // Redelivery cannot fix a missing or unaddressable order
            error!(error = %e, "razorpay_order_not_updatable");
        }
        Err(e) => {
            error!(error = %e, "razorpay_order_update_failed");
            return Err(WebhookError::Store(e));
        }
    }

    Ok(StatusResponse::ok())
}
