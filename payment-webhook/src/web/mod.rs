//! Web server module for the Razorpay webhook.
//!
//! Routes:
//! - `POST /webhook/razorpay`: signed payment notifications
//! - `GET /health`: liveness probe

pub mod error;
pub mod handlers;
pub mod signature;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, WebhookError};
pub use handlers::{health, razorpay_webhook, AppState, StatusResponse};
pub use signature::{sign_body, verify_razorpay_signature, SIGNATURE_HEADER};

/// Path Razorpay delivers webhooks to.
pub const RAZORPAY_WEBHOOK_PATH: &str = "/webhook/razorpay";

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route(
            RAZORPAY_WEBHOOK_PATH,
            post(razorpay_webhook).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
