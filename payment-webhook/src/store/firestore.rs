//! Cloud Firestore document store over the REST API.
//!
//! Each update is a single `documents:commit` write carrying:
//! - `update` with the plain fields
//! - `updateMask` naming exactly those fields
//! - `updateTransforms` setting server timestamps to `REQUEST_TIME`
//! - `currentDocument.exists = true` so a missing order is never created
//!
//! Reference: https://cloud.google.com/firestore/docs/reference/rest/v1/projects.databases.documents/commit

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use url::Url;

use super::{validate_document_id, DocumentStore, FieldUpdate, FieldValue, StoreError};
use crate::Config;

/// Production Firestore endpoint.
pub const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com";

/// Token endpoint of the GCE / Cloud Run metadata server.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Where bearer tokens for Firestore come from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// Fixed token from configuration
    Static(String),
    /// Local emulator, which accepts the `owner` token
    Emulator,
    /// Fetched from the metadata server on every write
    Metadata(Url),
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Firestore REST client implementing [`DocumentStore`].
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    base_url: Url,
    database_path: String,
    tokens: TokenSource,
}

impl FirestoreStore {
    /// Create a store for `projects/{project_id}/databases/{database_id}`.
    pub fn new(
        client: Client,
        base_url: Url,
        project_id: &str,
        database_id: &str,
        tokens: TokenSource,
    ) -> Self {
        Self {
            client,
            base_url,
            database_path: format!("projects/{}/databases/{}", project_id, database_id),
            tokens,
        }
    }

    /// Build a store from application configuration.
    ///
    /// An emulator host takes precedence over a static token, which takes
    /// precedence over the metadata server.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.firestore_timeout_ms))
            .build()?;

        let (base_url, tokens) = match (&config.firestore_emulator_host, &config.firestore_access_token) {
            (Some(host), _) => (format!("http://{}", host), TokenSource::Emulator),
            (None, Some(token)) => (FIRESTORE_BASE_URL.to_string(), TokenSource::Static(token.clone())),
            (None, None) => (
                FIRESTORE_BASE_URL.to_string(),
                TokenSource::Metadata(parse_url(METADATA_TOKEN_URL)?),
            ),
        };

        Ok(Self::new(
            client,
            parse_url(&base_url)?,
            &config.firestore_project_id,
            &config.firestore_database_id,
            tokens,
        ))
    }

    /// Fully qualified resource name of a document.
    pub fn document_name(&self, collection: &str, document_id: &str) -> String {
        format!(
            "{}/documents/{}/{}",
            self.database_path, collection, document_id
        )
    }

    fn commit_url(&self) -> Result<Url, StoreError> {
        let path = format!("v1/{}/documents:commit", self.database_path);
        self.base_url
            .join(&path)
            .map_err(|e| StoreError::Backend {
                status: 0,
                message: format!("invalid commit url: {}", e),
            })
    }

    async fn bearer_token(&self) -> Result<String, StoreError> {
        match &self.tokens {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Emulator => Ok("owner".to_string()),
            TokenSource::Metadata(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(StoreError::Auth(format!(
                        "metadata server returned HTTP {}",
                        response.status().as_u16()
                    )));
                }

                let token: MetadataToken = response.json().await?;
                Ok(token.access_token)
            }
        }
    }
}

/// Build the body of a single-write commit request.
pub fn commit_body(document_name: &str, update: &FieldUpdate) -> Value {
    let mut fields = Map::new();
    let mut mask = Vec::new();
    let mut transforms = Vec::new();

    for (name, value) in update.fields() {
        match value {
            FieldValue::String(s) => {
                fields.insert(name.clone(), json!({ "stringValue": s }));
                mask.push(Value::String(quote_field_path(name)));
            }
            FieldValue::Json(v) => {
                fields.insert(name.clone(), to_firestore_value(v));
                mask.push(Value::String(quote_field_path(name)));
            }
            FieldValue::ServerTimestamp => {
                transforms.push(json!({
                    "fieldPath": quote_field_path(name),
                    "setToServerValue": "REQUEST_TIME"
                }));
            }
        }
    }

    let mut write = json!({
        "update": { "name": document_name, "fields": fields },
        "updateMask": { "fieldPaths": mask },
        "currentDocument": { "exists": true }
    });

    if !transforms.is_empty() {
        write["updateTransforms"] = Value::Array(transforms);
    }

    json!({ "writes": [write] })
}

/// Convert plain JSON into Firestore's typed value encoding.
pub fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // int64 travels as a decimal string
                json!({ "integerValue": i.to_string() })
            } else if n.is_u64() {
                // beyond int64; keep every digit rather than rounding to a double
                json!({ "stringValue": n.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(to_firestore_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), to_firestore_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Quote a field name for use in a field path when it is not a simple identifier.
pub fn quote_field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn parse_url(raw: &str) -> Result<Url, StoreError> {
    Url::parse(raw).map_err(|e| StoreError::Backend {
        status: 0,
        message: format!("invalid url {}: {}", raw, e),
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn update_document(
        &self,
        collection: &str,
        document_id: &str,
        update: &FieldUpdate,
    ) -> Result<(), StoreError> {
        validate_document_id(document_id)?;

        let name = self.document_name(collection, document_id);
        let body = commit_body(&name, update);
        let token = self.bearer_token().await?;

        let response = self
            .client
            .post(self.commit_url()?)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(
                collection = collection,
                document_id = document_id,
                field_count = update.fields().len(),
                "firestore_document_updated"
            );
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error)
            .unwrap_or(ErrorBody {
                message: text,
                status: String::new(),
            });

        warn!(
            collection = collection,
            document_id = document_id,
            http_status = status.as_u16(),
            firestore_status = %error.status,
            "firestore_update_failed"
        );

        Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound {
                collection: collection.to_string(),
                document_id: document_id.to_string(),
            },
            _ if error.status == "NOT_FOUND" => StoreError::NotFound {
                collection: collection.to_string(),
                document_id: document_id.to_string(),
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Auth(error.message),
            _ => StoreError::Backend {
                status: status.as_u16(),
                message: error.message,
            },
        })
    }
}
