//! User model for storage and API.

use crate::db::{FieldValue, Fields};
use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Document field holding the last sign-in time.
pub const LAST_LOGIN_FIELD: &str = "lastLoginAt";

/// `createUser` payload.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    #[validate(email)]
    pub email: String,
}

/// `createUser` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateUserResponse {
    pub uid: String,
    pub name: String,
    pub email: String,
}

/// User profile document, keyed by the identity service uid.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
}

impl UserRecord {
    /// Fields for a fresh user; `created_at` is the store's timestamp marker.
    pub fn into_fields(self, created_at: FieldValue) -> Fields {
        Fields::from([
            ("name".to_string(), FieldValue::String(self.name)),
            ("email".to_string(), FieldValue::String(self.email)),
            ("createdAt".to_string(), created_at),
        ])
    }
}
