//! Product model for storage and API.

use crate::db::{FieldValue, Fields};
use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// `createProduct` payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(length(max = 4096))]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
}

/// `createProduct` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateProductResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub user_id: String,
}

impl CreateProductInput {
    /// Document fields; both timestamps are the store's timestamp marker.
    pub fn to_fields(&self, now: FieldValue) -> Fields {
        Fields::from([
            ("name".to_string(), FieldValue::String(self.name.clone())),
            (
                "description".to_string(),
                FieldValue::String(self.description.clone()),
            ),
            ("price".to_string(), FieldValue::Double(self.price)),
            ("userId".to_string(), FieldValue::String(self.user_id.clone())),
            ("createdAt".to_string(), now.clone()),
            ("updatedAt".to_string(), now),
        ])
    }

    pub fn into_response(self, id: String) -> CreateProductResponse {
        CreateProductResponse {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            user_id: self.user_id,
        }
    }
}
