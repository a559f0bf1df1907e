//! In-memory document store.
//!
//! Behaves like Firestore for the single operation the webhook uses: updates
//! fail with `NotFound` on missing documents and server timestamps come from
//! the store's own clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{validate_document_id, DocumentStore, FieldUpdate, FieldValue, StoreError};

type DocumentKey = (String, String);

/// Shared in-memory collection of JSON documents.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<InMemoryInner>,
}

#[derive(Default)]
struct InMemoryInner {
    documents: RwLock<HashMap<DocumentKey, Map<String, Value>>>,
    writes: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a whole document. Non-object values become empty documents.
    pub async fn insert(&self, collection: &str, document_id: &str, document: Value) {
        let fields = match document {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.inner
            .documents
            .write()
            .await
            .insert((collection.to_string(), document_id.to_string()), fields);
    }

    /// Snapshot of a document.
    pub async fn get(&self, collection: &str, document_id: &str) -> Option<Value> {
        self.inner
            .documents
            .read()
            .await
            .get(&(collection.to_string(), document_id.to_string()))
            .cloned()
            .map(Value::Object)
    }

    /// Number of updates applied successfully.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        update: &FieldUpdate,
    ) -> Result<(), StoreError> {
        validate_document_id(document_id)?;

        let mut documents = self.inner.documents.write().await;
        let document = documents
            .get_mut(&(collection.to_string(), document_id.to_string()))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                document_id: document_id.to_string(),
            })?;

        for (name, value) in update.fields() {
            let value = match value {
                FieldValue::String(s) => Value::String(s.clone()),
                FieldValue::Json(v) => v.clone(),
                FieldValue::ServerTimestamp => Value::from(now_millis()),
            };
            document.insert(name.clone(), value);
        }

        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = InMemoryStore::new();
        store
            .insert("orders", "ORD1", json!({"status": "PENDING", "amount": 500}))
            .await;

        let update = FieldUpdate::new()
            .set("status", FieldValue::String("PAID".to_string()))
            .set("snapshot", FieldValue::Json(json!({"id": "pay_1"})))
            .set("updated_at", FieldValue::ServerTimestamp);

        store.update_document("orders", "ORD1", &update).await.unwrap();

        let doc = store.get("orders", "ORD1").await.unwrap();
        assert_eq!(doc["status"], "PAID");
        assert_eq!(doc["amount"], 500);
        assert_eq!(doc["snapshot"]["id"], "pay_1");
        assert!(doc["updated_at"].as_u64().unwrap() > 0);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_document_not_created() {
        let store = InMemoryStore::new();
        let update = FieldUpdate::new().set("status", FieldValue::String("PAID".to_string()));

        let err = store
            .update_document("orders", "ORD404", &update)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(store.get("orders", "ORD404").await.is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_rejects_path_like_ids() {
        let store = InMemoryStore::new();
        let update = FieldUpdate::new().set("status", FieldValue::String("PAID".to_string()));

        let err = store
            .update_document("orders", "ORD1/items", &update)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocumentId(_)));
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let store = InMemoryStore::new();
        store.insert("orders", "X", json!({})).await;
        let update = FieldUpdate::new().set("status", FieldValue::String("PAID".to_string()));

        assert!(store.update_document("carts", "X", &update).await.is_err());
        assert!(store.update_document("orders", "X", &update).await.is_ok());
    }
}
