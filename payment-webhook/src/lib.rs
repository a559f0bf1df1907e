//! Razorpay payment webhook receiver.
//!
//! Verifies Razorpay's HMAC signature over the raw body, classifies the
//! event, and marks the matching Firestore order as paid.
//!
//! ## Architecture
//!
//! ```text
//! Razorpay → POST /webhook/razorpay → signature → event → process → DocumentStore
//! ```

pub mod config;
pub mod event;
pub mod process;
pub mod store;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use event::{parse_event, PayloadError, PaymentEvent, WebhookEvent};
pub use process::{process_event, Outcome};
pub use store::{DocumentStore, FieldUpdate, FieldValue, FirestoreStore, InMemoryStore, StoreError};
pub use web::{router, AppState};
