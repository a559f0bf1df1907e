//! Razorpay webhook payload types.
//!
//! Only the fields this service acts on are typed. The payment entity is
//! additionally kept as raw JSON so the full snapshot can be stored with the
//! order.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Event fired when a payment is captured.
pub const PAYMENT_CAPTURED: &str = "payment.captured";

/// Event fired when a payment link is paid in full.
pub const PAYMENT_LINK_PAID: &str = "payment_link.paid";

/// Notes key carrying our own order id.
pub const INTERNAL_ORDER_ID_NOTE: &str = "internal_order_id";

/// Envelope of every Razorpay webhook delivery.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    /// Event discriminator, e.g. `payment.captured`
    pub event: String,
    /// Event specific entities, each wrapped as `{ "entity": { ... } }`
    #[serde(default)]
    pub payload: Value,
}

impl WebhookEnvelope {
    /// The `payload.payment.entity` object, if present.
    pub fn payment_entity(&self) -> Option<&Value> {
        self.payload
            .pointer("/payment/entity")
            .filter(|entity| !entity.is_null())
    }
}

/// Typed view of a payment entity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentEntity {
    /// Razorpay payment id, e.g. `pay_29QQoUBi66xm2f`
    pub id: String,
    /// Free-form merchant notes
    #[serde(default, deserialize_with = "deserialize_notes")]
    pub notes: HashMap<String, Value>,
}

impl PaymentEntity {
    /// Internal order id from the notes, if present and not blank.
    ///
    /// The id is returned exactly as sent; it is the document key.
    pub fn internal_order_id(&self) -> Option<&str> {
        self.notes
            .get(INTERNAL_ORDER_ID_NOTE)
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
    }
}

/// Razorpay serializes empty notes as `[]` rather than `{}`.
fn deserialize_notes<'de, D>(deserializer: D) -> Result<HashMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Notes {
        Map(HashMap<String, Value>),
        List(Vec<Value>),
    }

    match Option::<Notes>::deserialize(deserializer)? {
        Some(Notes::Map(map)) => Ok(map),
        Some(Notes::List(_)) | None => Ok(HashMap::new()),
    }
}
