//! Payment event processing.
//!
//! Turns a classified webhook event into at most one order update.
//!
//! ## Processing Flow
//!
//! ```text
//! WebhookEvent → process_event() → FieldUpdate on orders/<internal_order_id>
//! ```

use serde_json::Value;
use tracing::{info, warn};

use crate::event::{PaymentEvent, WebhookEvent};
use crate::store::{DocumentStore, FieldUpdate, FieldValue, StoreError};

/// Order status written for a completed payment.
pub const PAID_STATUS: &str = "PAID";

/// What processing did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The order document was updated
    OrderPaid {
        order_id: String,
        payment_id: String,
    },
    /// Payment carried no internal order id; nothing written
    MissingOrderId { payment_id: String },
    /// Event type is not acted on; nothing written
    Ignored { event: String },
}

/// Fields written to an order when its payment completes.
pub fn paid_order_update(payment_id: &str, raw_entity: &Value) -> FieldUpdate {
    FieldUpdate::new()
        .set("status", FieldValue::String(PAID_STATUS.to_string()))
        .set("payment_id", FieldValue::String(payment_id.to_string()))
        .set("razorpay_payment_data", FieldValue::Json(raw_entity.clone()))
        .set("updated_at", FieldValue::ServerTimestamp)
}

/// Apply a classified event to the order collection.
pub async fn process_event(
    store: &dyn DocumentStore,
    collection: &str,
    event: WebhookEvent,
) -> Result<Outcome, StoreError> {
    match event {
        WebhookEvent::Ignored { event } => Ok(Outcome::Ignored { event }),
        WebhookEvent::Payment(payment) => process_payment(store, collection, payment).await,
    }
}

async fn process_payment(
    store: &dyn DocumentStore,
    collection: &str,
    event: PaymentEvent,
) -> Result<Outcome, StoreError> {
    let payment_id = event.payment.id.clone();

    let Some(order_id) = event.payment.internal_order_id() else {
        warn!(
            event = %event.event,
            payment_id = %payment_id,
            "payment_without_internal_order_id"
        );
        return Ok(Outcome::MissingOrderId { payment_id });
    };

    let update = paid_order_update(&payment_id, &event.raw_entity);
    store.update_document(collection, order_id, &update).await?;

    info!(
        event = %event.event,
        order_id = %order_id,
        payment_id = %payment_id,
        "order_marked_paid"
    );

    Ok(Outcome::OrderPaid {
        order_id: order_id.to_string(),
        payment_id,
    })
}
