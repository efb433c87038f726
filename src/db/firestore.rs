// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing [`DocumentStore`].
//!
//! Server timestamps are written as `REQUEST_TIME` field transforms, and
//! batches are committed as a single transaction.

use crate::db::{Document, DocumentStore, FieldValue, Fields, QueryOp, StoreError, WriteBatch};
use async_trait::async_trait;
use gcloud_sdk::google::firestore::v1::value::ValueType;
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::BTreeMap;

// Firestore limits batch/transaction writes to 500 operations.
const MAX_BATCH_WRITES: usize = 500;

const AUTO_ID_LEN: usize = 20;
const AUTO_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// `emulator_host` selects the unauthenticated emulator connection.
    pub async fn new(project_id: &str, emulator_host: Option<&str>) -> Result<Self, StoreError> {
        if let Some(host) = emulator_host {
            return Self::create_emulator_client(project_id, host).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str, host: &str) -> Result<Self, StoreError> {
        tracing::info!(host, "Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new("owner".to_string().into()),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client.as_ref().ok_or(StoreError::NotConnected)
    }

    /// Write `fields` to `collection/id`, turning server-timestamp markers into transforms.
    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let (values, server_time_fields) = split_server_timestamps(fields);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .transforms(|t| {
                t.fields(server_time_fields.iter().map(|name| {
                    t.field(name.as_str())
                        .server_value(firestore::FirestoreTransformServerValue::RequestTime)
                }))
            })
            .object(&values)
            .execute()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = auto_id()?;
        self.write_document(collection, &id, fields).await?;
        tracing::debug!(collection, id = %id, "Document added");
        Ok(id)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        self.write_document(collection, id, fields).await?;
        tracing::debug!(collection, id, "Document set");
        Ok(())
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: FieldValue,
    ) -> Result<Vec<Document>, StoreError> {
        let field = field.to_string();

        let docs = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| {
                let f = q.field(field.as_str());
                match op {
                    QueryOp::LessThan => f.less_than(value.clone()),
                    QueryOp::LessThanOrEqual => f.less_than_or_equal(value.clone()),
                    QueryOp::Equal => f.eq(value.clone()),
                    QueryOp::GreaterThanOrEqual => f.greater_than_or_equal(value.clone()),
                    QueryOp::GreaterThan => f.greater_than(value.clone()),
                }
            })
            .query()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(docs
            .into_iter()
            .map(|doc| Document {
                id: document_id_from_name(&doc.name).to_string(),
                fields: decode_fields(doc.fields),
            })
            .collect())
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let size = batch.len();
        if size > MAX_BATCH_WRITES {
            tracing::warn!(
                size,
                limit = MAX_BATCH_WRITES,
                "Batch exceeds Firestore write limit, commit will be rejected"
            );
        }

        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

        for doc in batch.deletes() {
            client
                .fluent()
                .delete()
                .from(doc.collection.as_str())
                .document_id(&doc.id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| StoreError::BatchCommit {
                    size,
                    message: format!("failed to stage {}/{}: {}", doc.collection, doc.id, e),
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| StoreError::BatchCommit {
                size,
                message: e.to_string(),
            })?;

        tracing::debug!(size, "Batch committed");
        Ok(())
    }
}

/// Separate plain values from server-timestamp markers.
fn split_server_timestamps(fields: Fields) -> (Fields, Vec<String>) {
    let mut server_time_fields = Vec::new();
    let values = fields
        .into_iter()
        .filter(|(name, value)| {
            if value.is_server_timestamp() {
                server_time_fields.push(name.clone());
                false
            } else {
                true
            }
        })
        .collect();
    (values, server_time_fields)
}

/// Last path segment of `projects/p/databases/d/documents/col/id`.
fn document_id_from_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn decode_fields<I>(fields: I) -> Fields
where
    I: IntoIterator<Item = (String, gcloud_sdk::google::firestore::v1::Value)>,
{
    let mut out = BTreeMap::new();
    for (name, value) in fields {
        let decoded = match value.value_type {
            None | Some(ValueType::NullValue(_)) => FieldValue::Null,
            Some(ValueType::BooleanValue(v)) => FieldValue::Bool(v),
            Some(ValueType::IntegerValue(v)) => FieldValue::Integer(v),
            Some(ValueType::DoubleValue(v)) => FieldValue::Double(v),
            Some(ValueType::StringValue(v)) => FieldValue::String(v),
            Some(ValueType::TimestampValue(ts)) => {
                match chrono::DateTime::from_timestamp(ts.seconds, ts.nanos.max(0) as u32) {
                    Some(dt) => FieldValue::Timestamp(dt),
                    None => continue,
                }
            }
            Some(_) => {
                tracing::debug!(field = %name, "Skipping unsupported Firestore field type");
                continue;
            }
        };
        out.insert(name, decoded);
    }
    out
}

/// Firestore-style 20 character document id.
fn auto_id() -> Result<String, StoreError> {
    // Largest multiple of the alphabet size below 256, to avoid modulo bias.
    const MAX_MULTIPLE: u8 = (256 / AUTO_ID_ALPHABET.len() * AUTO_ID_ALPHABET.len()) as u8;

    let rng = SystemRandom::new();
    let mut id = String::with_capacity(AUTO_ID_LEN);
    let mut buf = [0u8; 40];

    while id.len() < AUTO_ID_LEN {
        rng.fill(&mut buf)
            .map_err(|_| StoreError::Backend("system randomness unavailable".to_string()))?;
        for b in buf.iter().filter(|b| **b < MAX_MULTIPLE) {
            if id.len() == AUTO_ID_LEN {
                break;
            }
            id.push(AUTO_ID_ALPHABET[*b as usize % AUTO_ID_ALPHABET.len()] as char);
        }
    }

    Ok(id)
}
