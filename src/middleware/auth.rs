// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ID token middleware for callable routes.
//!
//! Unlike a hard auth gate, a missing token is not rejected here: the
//! request proceeds with no claim and the handler's guard decides. A token
//! that is present but invalid is rejected as unauthenticated.

use crate::error::AppError;
use crate::services::id_token::TokenError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Caller identity asserted by the identity service for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaim {
    pub subject_id: String,
    pub email: Option<String>,
}

impl IdentityClaim {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: None,
        }
    }
}

/// Request extension carrying the (optional) verified claim.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub claim: Option<IdentityClaim>,
}

/// Middleware that verifies an `Authorization: Bearer` ID token when present.
pub async fn attach_identity(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let claim = match auth_header {
        None => None,
        Some(h) => {
            let Some(token) = h.strip_prefix("Bearer ").filter(|t| !t.is_empty()) else {
                tracing::warn!("Rejected callable request with malformed Authorization header");
                return AppError::unauthenticated().into_response();
            };

            match state.id_token_verifier.verify(token).await {
                Ok(claim) => Some(claim),
                Err(TokenError::Invalid(reason)) => {
                    tracing::warn!(reason = %reason, "Rejected callable request: invalid ID token");
                    return AppError::unauthenticated().into_response();
                }
                Err(err @ TokenError::Transient(_)) => {
                    return AppError::internal("Unable to verify credentials.", err)
                        .into_response();
                }
            }
        }
    };

    if let Some(claim) = &claim {
        tracing::debug!(uid = %claim.subject_id, "Verified caller");
    }

    request.extensions_mut().insert(Caller { claim });
    next.run(request).await
}
