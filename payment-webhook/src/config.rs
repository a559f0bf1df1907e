//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup. A missing webhook secret or Firestore
//! project is a startup error, never a per-request one.

use std::env;

use thiserror::Error;
use tracing::warn;

/// Default collection holding order documents.
pub const DEFAULT_ORDERS_COLLECTION: &str = "orders";

/// Firestore's name for the default database of a project.
pub const DEFAULT_DATABASE_ID: &str = "(default)";

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Shared secret used by Razorpay to sign webhook bodies
    pub razorpay_webhook_secret: String,

    /// Google Cloud project that owns the Firestore database
    pub firestore_project_id: String,

    /// Firestore database id within the project
    pub firestore_database_id: String,

    /// `host:port` of a local Firestore emulator, if one is used
    pub firestore_emulator_host: Option<String>,

    /// Static OAuth bearer token for Firestore
    pub firestore_access_token: Option<String>,

    /// Timeout for a single Firestore request in milliseconds
    pub firestore_timeout_ms: u64,

    /// Collection holding order documents
    pub orders_collection: String,

    /// Maximum accepted webhook body size in bytes
    pub max_body_bytes: usize,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("razorpay_webhook_secret", &"<redacted>")
            .field("firestore_project_id", &self.firestore_project_id)
            .field("firestore_database_id", &self.firestore_database_id)
            .field("firestore_emulator_host", &self.firestore_emulator_host)
            .field(
                "firestore_access_token",
                &self.firestore_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("firestore_timeout_ms", &self.firestore_timeout_ms)
            .field("orders_collection", &self.orders_collection)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let razorpay_webhook_secret = non_blank("RAZORPAY_WEBHOOK_SECRET")
            .ok_or(ConfigError::Missing("RAZORPAY_WEBHOOK_SECRET"))?;

        let firestore_project_id = non_blank("FIRESTORE_PROJECT_ID")
            .or_else(|| non_blank("GOOGLE_CLOUD_PROJECT"))
            .ok_or(ConfigError::Missing("FIRESTORE_PROJECT_ID"))?;

        Ok(Config {
            port: parse_or("PORT", lookup("PORT"), 8080),

            razorpay_webhook_secret,

            firestore_project_id,

            firestore_database_id: non_blank("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|| DEFAULT_DATABASE_ID.to_string()),

            firestore_emulator_host: non_blank("FIRESTORE_EMULATOR_HOST"),

            firestore_access_token: non_blank("FIRESTORE_ACCESS_TOKEN"),

            firestore_timeout_ms: parse_or(
                "FIRESTORE_TIMEOUT_MS",
                lookup("FIRESTORE_TIMEOUT_MS"),
                10_000,
            ),

            orders_collection: non_blank("ORDERS_COLLECTION")
                .unwrap_or_else(|| DEFAULT_ORDERS_COLLECTION.to_string()),

            max_body_bytes: parse_or("MAX_BODY_BYTES", lookup("MAX_BODY_BYTES"), 1024 * 1024),
        })
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset or invalid.
fn parse_or<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "invalid_numeric_config_using_default");
            default
        }
    }
}
