//! Razorpay webhook signature verification.
//!
//! Razorpay signs the raw request body with HMAC-SHA256 keyed by the webhook
//! secret and sends the hex digest in `X-Razorpay-Signature`.
//! Reference: https://razorpay.com/docs/webhooks/validate-test/

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

/// Verify a Razorpay webhook signature.
///
/// # Arguments
///
/// * `secret` - The webhook secret configured in the Razorpay dashboard
/// * `body` - The exact request body bytes as received
/// * `signature` - The `X-Razorpay-Signature` header value, if present
///
/// # Returns
///
/// `true` only if the header is present and matches the expected digest.
/// Any malformed input fails closed.
pub fn verify_razorpay_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let signature = match signature {
        Some(s) if !s.is_empty() => s,
        _ => {
            warn!("razorpay_signature_missing");
            return false;
        }
    };

    if secret.is_empty() {
        warn!("razorpay_secret_not_configured");
        return false;
    }

    // Razorpay sends lowercase hex; any other spelling is a different signature
    if !is_lowercase_hex(signature) {
        warn!(signature_length = signature.len(), "razorpay_signature_not_hex");
        return false;
    }

    let provided = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(signature_length = signature.len(), "razorpay_signature_not_hex");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("razorpay_signature_invalid_key");
            return false;
        }
    };

    mac.update(body);

    // verify_slice compares in constant time and rejects length mismatches
    let valid = mac.verify_slice(&provided).is_ok();

    if !valid {
        warn!(body_length = body.len(), "razorpay_signature_mismatch");
    }

    valid
}

fn is_lowercase_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Compute the hex signature Razorpay would send for `body`.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}
