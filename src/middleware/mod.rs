// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (caller identity, scheduler authentication).

pub mod auth;
pub mod scheduler_auth;

pub use auth::{attach_identity, Caller, IdentityClaim};
pub use scheduler_auth::require_scheduler_auth;
