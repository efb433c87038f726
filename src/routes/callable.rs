// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Callable function endpoints.
//!
//! Request bodies are `{"data": ...}` and successful responses are
//! `{"result": ...}`. The caller's identity comes from the `attach_identity`
//! middleware.

use crate::error::{AppError, Result};
use crate::middleware::auth::Caller;
use crate::models::{CreateProductInput, CreateProductResponse, CreateUserInput, CreateUserResponse};
use crate::services::products::CREATE_PRODUCT_FAILED;
use crate::services::users::CREATE_USER_FAILED;
use crate::services::{ProductService, UserService};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    routing::post,
    Extension, Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Callable routes (caller identity is optional at this layer).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/createUser", post(create_user))
        .route("/createProduct", post(create_product))
}

#[derive(Deserialize)]
struct CallableRequest<T> {
    data: T,
}

/// Successful callable response.
#[derive(Serialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

/// Decode and validate the `data` payload.
fn parse_callable<T>(body: &[u8]) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let request: CallableRequest<T> = serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidArgument(format!("Invalid request data: {e}")))?;

    request
        .data
        .validate()
        .map_err(|e| AppError::InvalidArgument(format!("Invalid request data: {e}")))?;

    Ok(request.data)
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Result<Json<CallableResponse<CreateUserResponse>>> {
    let input: CreateUserInput = parse_callable(&body)?;

    let platform = state
        .platform
        .ensure_initialized()
        .await
        .map_err(|e| AppError::internal(CREATE_USER_FAILED, e))?;

    let result = UserService::new(platform.store.clone(), platform.identity.clone())
        .create_user(caller.claim.as_ref(), input)
        .await?;

    Ok(Json(CallableResponse { result }))
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Result<Json<CallableResponse<CreateProductResponse>>> {
    let input: CreateProductInput = parse_callable(&body)?;

    let platform = state
        .platform
        .ensure_initialized()
        .await
        .map_err(|e| AppError::internal(CREATE_PRODUCT_FAILED, e))?;

    let result = ProductService::new(platform.store.clone())
        .create_product(caller.claim.as_ref(), input)
        .await?;

    Ok(Json(CallableResponse { result }))
}
