//! Handler errors and their HTTP mapping.
//!
//! Response bodies are deliberately generic; the detailed cause only goes to
//! the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::event::PayloadError;
use crate::store::StoreError;

/// Errors a webhook request can end with.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("signature verification failed")]
    InvalidSignature,

    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] PayloadError),

    #[error("order update failed: {0}")]
    Store(#[from] StoreError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub detail: &'static str,
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::InvalidSignature | WebhookError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> &'static str {
        match self {
            WebhookError::InvalidSignature => "Signature verification failed",
            WebhookError::MalformedPayload(_) => "Malformed payload",
            WebhookError::Store(_) => "Order update failed",
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(ErrorResponse {
                status: "error",
                detail: self.detail(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            WebhookError::InvalidSignature.status_code(),
            StatusCode::BAD_REQUEST
        );

        let malformed = WebhookError::from(PayloadError::MissingPaymentEntity {
            event: "payment.captured".to_string(),
        });
        assert_eq!(malformed.status_code(), StatusCode::BAD_REQUEST);

        let store = WebhookError::from(StoreError::Backend {
            status: 503,
            message: "unavailable".to_string(),
        });
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_detail_hides_cause() {
        let err = WebhookError::from(StoreError::Auth("token expired for sa@x".to_string()));
        assert_eq!(err.detail(), "Order update failed");
    }
}
