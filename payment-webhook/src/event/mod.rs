//! Webhook payload decoding and classification.
//!
//! ## Classification
//!
//! ```text
//! raw body → WebhookEnvelope → WebhookEvent::{Payment, Ignored}
//! ```
//!
//! Decoding happens once at the boundary. A recognized payment event without
//! a usable payment entity is rejected here rather than deeper in processing.

pub mod types;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

pub use types::{
    PaymentEntity, WebhookEnvelope, INTERNAL_ORDER_ID_NOTE, PAYMENT_CAPTURED, PAYMENT_LINK_PAID,
};

/// Events that mark an order as paid.
pub const PAYMENT_EVENTS: [&str; 2] = [PAYMENT_CAPTURED, PAYMENT_LINK_PAID];

/// Errors raised while decoding a webhook body.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("body is not a valid webhook envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    #[error("event {event} has no payload.payment.entity")]
    MissingPaymentEntity { event: String },

    #[error("event {event} has an invalid payment entity: {source}")]
    InvalidPaymentEntity {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A payment completion that should be applied to an order.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEvent {
    /// Event name as sent by Razorpay
    pub event: String,
    /// Typed view of the payment entity
    pub payment: PaymentEntity,
    /// Payment entity exactly as received, stored for audit
    pub raw_entity: Value,
}

/// Classified webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    /// A payment event this service acts on
    Payment(PaymentEvent),
    /// Any other event; acknowledged without action
    Ignored { event: String },
}

/// Whether `event` is one of the payment completion events.
pub fn is_payment_event(event: &str) -> bool {
    PAYMENT_EVENTS.contains(&event)
}

/// Decode and classify a webhook body.
///
/// Must only be called after the signature over `body` has been verified.
pub fn parse_event(body: &[u8]) -> Result<WebhookEvent, PayloadError> {
    let envelope: WebhookEnvelope =
        serde_json::from_slice(body).map_err(PayloadError::InvalidEnvelope)?;

    if !is_payment_event(&envelope.event) {
        info!(event = %envelope.event, "webhook_event_ignored");
        return Ok(WebhookEvent::Ignored {
            event: envelope.event,
        });
    }

    let raw_entity = envelope
        .payment_entity()
        .cloned()
        .ok_or_else(|| PayloadError::MissingPaymentEntity {
            event: envelope.event.clone(),
        })?;

    let payment = PaymentEntity::deserialize(&raw_entity).map_err(|source| {
        PayloadError::InvalidPaymentEntity {
            event: envelope.event.clone(),
            source,
        }
    })?;

    info!(
        event = %envelope.event,
        payment_id = %payment.id,
        has_internal_order_id = payment.internal_order_id().is_some(),
        "webhook_payment_event_parsed"
    );

    Ok(WebhookEvent::Payment(PaymentEvent {
        event: envelope.event,
        payment,
        raw_entity,
    }))
}
