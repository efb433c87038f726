// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document store capability and its Firestore implementation.
//!
//! Handlers only see [`DocumentStore`]; tests swap in fakes.

pub mod firestore;

pub use firestore::FirestoreDb;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";
}

/// A single document field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Resolved by the store to its commit time when written.
    ServerTimestamp,
}

impl FieldValue {
    pub fn is_server_timestamp(&self) -> bool {
        matches!(self, FieldValue::ServerTimestamp)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null | FieldValue::ServerTimestamp => serializer.serialize_none(),
            FieldValue::Bool(v) => serializer.serialize_bool(*v),
            FieldValue::Integer(v) => serializer.serialize_i64(*v),
            FieldValue::Double(v) => serializer.serialize_f64(*v),
            FieldValue::String(v) => serializer.serialize_str(v),
            // Firestore's serializer recognises this newtype and emits a timestampValue.
            FieldValue::Timestamp(v) => ::firestore::FirestoreTimestamp(*v).serialize(serializer),
        }
    }
}

// Firestore hands timestamps to `deserialize_any` as RFC3339 strings, so
// they come back as `String`. Typed decoding of query results lives in
// the store implementation.
impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a scalar document field")
    }

    fn visit_unit<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FieldValue, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<FieldValue, E> {
        Ok(FieldValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldValue, E> {
        i64::try_from(v)
            .map(FieldValue::Integer)
            .map_err(|_| E::custom(format!("integer out of range: {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FieldValue, E> {
        Ok(FieldValue::Double(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldValue, E> {
        Ok(FieldValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<FieldValue, E> {
        Ok(FieldValue::String(v))
    }
}

/// Document fields keyed by name.
pub type Fields = BTreeMap<String, FieldValue>;

/// A document returned from a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Reference to a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: &str, id: impl Into<String>) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.into(),
        }
    }
}

/// Comparison operators supported by [`DocumentStore::query_where`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    LessThan,
    LessThanOrEqual,
    Equal,
    GreaterThanOrEqual,
    GreaterThan,
}

/// Deletes staged for one all-or-nothing commit.
#[derive(Debug, Default)]
pub struct WriteBatch {
    deletes: Vec<DocumentRef>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_delete(&mut self, doc: DocumentRef) {
        self.deletes.push(doc);
    }

    pub fn deletes(&self) -> &[DocumentRef] {
        &self.deletes
    }

    pub fn len(&self) -> usize {
        self.deletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty()
    }
}

/// Document store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database not connected (offline mode)")]
    NotConnected,

    #[error("Database error: {0}")]
    Backend(String),

    #[error("Failed to commit batch of {size} writes: {message}")]
    BatchCommit { size: usize, message: String },
}

/// Capabilities the handlers need from the document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with a store-assigned id and return the id.
    async fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Create or overwrite the document `collection/id`.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError>;

    /// Return every document where `field op value` holds.
    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        op: QueryOp,
        value: FieldValue,
    ) -> Result<Vec<Document>, StoreError>;

    /// Start an empty batch.
    fn new_batch(&self) -> WriteBatch {
        WriteBatch::new()
    }

    /// Apply every staged write atomically.
    async fn commit_batch(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Marker resolved to the commit time.
    fn server_timestamp(&self) -> FieldValue {
        FieldValue::ServerTimestamp
    }
}
