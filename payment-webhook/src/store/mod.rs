//! Document store access.
//!
//! The webhook only ever needs one capability from the database: update a
//! named, already existing document with a partial set of fields. That is
//! the whole [`DocumentStore`] trait.
//!
//! ## Implementations
//!
//! - [`FirestoreStore`]: Cloud Firestore over its REST API
//! - [`InMemoryStore`]: process-local fake used by tests

pub mod firestore;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use firestore::FirestoreStore;
pub use memory::InMemoryStore;

/// Longest document id Firestore accepts, in bytes.
const MAX_DOCUMENT_ID_BYTES: usize = 1500;

/// Errors raised by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {collection}/{document_id} does not exist")]
    NotFound {
        collection: String,
        document_id: String,
    },

    #[error("invalid document id: {0:?}")]
    InvalidDocumentId(String),

    #[error("store authentication failed: {0}")]
    Auth(String),

    #[error("store returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl StoreError {
    /// Whether redelivering the same update could succeed later.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            StoreError::NotFound { .. } | StoreError::InvalidDocumentId(_)
        )
    }
}

/// A single field value in a partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain string value
    String(String),
    /// Arbitrary JSON, stored as a nested document
    Json(Value),
    /// Timestamp assigned by the database when the write is applied
    ServerTimestamp,
}

/// Ordered set of fields to overwrite on a document.
///
/// Fields not named here are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    fields: Vec<(String, FieldValue)>,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing an earlier value for the same field.
    pub fn set(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        let name = name.into();
        self.fields.retain(|(existing, _)| *existing != name);
        self.fields.push((name, value));
        self
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }
}

/// Partial-update access to a document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Overwrite the fields in `update` on `collection/document_id`.
    ///
    /// The document must already exist; it is never created.
    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        update: &FieldUpdate,
    ) -> Result<(), StoreError>;
}

/// Reject ids Firestore cannot address as a single document.
pub fn validate_document_id(document_id: &str) -> Result<(), StoreError> {
    let valid = !document_id.is_empty()
        && document_id.len() <= MAX_DOCUMENT_ID_BYTES
        && !document_id.contains('/')
        && document_id != "."
        && document_id != ".."
        && !(document_id.starts_with("__") && document_id.ends_with("__"));

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidDocumentId(document_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_update_replaces_duplicates() {
        let update = FieldUpdate::new()
            .set("status", FieldValue::String("PENDING".to_string()))
            .set("payment_id", FieldValue::String("pay_1".to_string()))
            .set("status", FieldValue::String("PAID".to_string()));

        assert_eq!(update.fields().len(), 2);
        assert_eq!(
            update.get("status"),
            Some(&FieldValue::String("PAID".to_string()))
        );
        assert_eq!(update.fields()[1].0, "status");
    }

    #[test]
    fn test_validate_document_id() {
        assert!(validate_document_id("ORD123").is_ok());
        assert!(validate_document_id("order-2024.01").is_ok());
        assert!(validate_document_id("").is_err());
        assert!(validate_document_id("a/b").is_err());
        assert!(validate_document_id(".").is_err());
        assert!(validate_document_id("..").is_err());
        assert!(validate_document_id("__reserved__").is_err());
        assert!(validate_document_id(&"x".repeat(1501)).is_err());
    }

    #[test]
    fn test_transient_classification() {
        assert!(!StoreError::NotFound {
            collection: "orders".to_string(),
            document_id: "ORD1".to_string()
        }
        .is_transient());
        assert!(!StoreError::InvalidDocumentId("a/b".to_string()).is_transient());
        assert!(StoreError::Auth("expired".to_string()).is_transient());
        assert!(StoreError::Backend {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_transient());
    }
}
