// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Catalog functions: callable user/product endpoints backed by Firestore
//! and Firebase Auth, plus a daily purge of inactive users.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod platform;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use platform::Platform;
use services::{GoogleOidcVerifier, IdTokenVerifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub platform: Arc<Platform>,
    pub id_token_verifier: IdTokenVerifier,
    pub scheduler_verifier: GoogleOidcVerifier,
}
