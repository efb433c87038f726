// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User registration.

use crate::db::{collections, DocumentStore};
use crate::error::{AppError, Result};
use crate::middleware::auth::IdentityClaim;
use crate::models::{CreateUserInput, CreateUserResponse, UserRecord};
use crate::services::authorization::authenticate;
use crate::services::identity::{IdentityProvider, NewIdentity};
use std::sync::Arc;

pub const CREATE_USER_FAILED: &str = "An error occurred while creating the user.";

/// Creates identity records and their profile documents.
pub struct UserService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    /// Register a user: create the identity, then the `users/{uid}` document.
    ///
    /// Any authenticated caller may register. If the document write fails
    /// after the identity was created, the identity is left in place.
    pub async fn create_user(
        &self,
        claim: Option<&IdentityClaim>,
        input: CreateUserInput,
    ) -> Result<CreateUserResponse> {
        authenticate(claim).into_result("create users")?;

        tracing::info!("Creating user in identity service");
        let record = self
            .identity
            .create_identity(NewIdentity {
                email: input.email.clone(),
                display_name: input.name.clone(),
            })
            .await
            .map_err(|e| AppError::internal(CREATE_USER_FAILED, e))?;
        tracing::info!(uid = %record.id, "User created in identity service");

        let fields = UserRecord {
            name: input.name,
            email: input.email,
        }
        .into_fields(self.store.server_timestamp());

        if let Err(e) = self
            .store
            .set_document(collections::USERS, &record.id, fields)
            .await
        {
            tracing::warn!(
                uid = %record.id,
                "User document write failed; identity record is orphaned"
            );
            return Err(AppError::internal(CREATE_USER_FAILED, e));
        }
        tracing::info!(uid = %record.id, "User document stored");

        Ok(CreateUserResponse {
            uid: record.id,
            name: record.display_name,
            email: record.email,
        })
    }
}
