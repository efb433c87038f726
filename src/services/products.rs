// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Product creation.

use crate::db::{collections, DocumentStore};
use crate::error::{AppError, Result};
use crate::middleware::auth::IdentityClaim;
use crate::models::{CreateProductInput, CreateProductResponse};
use crate::services::authorization::authorize;
use std::sync::Arc;

pub const CREATE_PRODUCT_FAILED: &str = "An error occurred while creating the product.";

pub struct ProductService {
    store: Arc<dyn DocumentStore>,
}

impl ProductService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Create a product owned by the caller.
    pub async fn create_product(
        &self,
        claim: Option<&IdentityClaim>,
        input: CreateProductInput,
    ) -> Result<CreateProductResponse> {
        authorize(claim, &input.user_id).into_result("create products")?;

        let fields = input.to_fields(self.store.server_timestamp());
        let id = self
            .store
            .add_document(collections::PRODUCTS, fields)
            .await
            .map_err(|e| AppError::internal(CREATE_PRODUCT_FAILED, e))?;

        tracing::info!(product_id = %id, user_id = %input.user_id, "Product created");

        Ok(input.into_response(id))
    }
}
