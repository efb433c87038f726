// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scheduled job routes for Cloud Scheduler callbacks.
//!
//! These endpoints are called by Cloud Scheduler, not directly by users.
//! The OIDC check is applied in routes/mod.rs.

use crate::services::scheduler::run_cleanup;
use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Router};
use std::sync::Arc;

/// Scheduler routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tasks/cleanup-old-users", post(cleanup_old_users))
}

/// Purge users inactive beyond the retention window.
///
/// Returns 500 on failure so the scheduler's retry policy applies.
async fn cleanup_old_users(State(state): State<Arc<AppState>>) -> StatusCode {
    tracing::info!("Processing cleanup trigger from Cloud Scheduler");

    match run_cleanup(
        &state.platform,
        state.config.retention_days,
        chrono::Utc::now(),
    )
    .await
    {
        Ok(report) => {
            tracing::info!(
                deleted = report.deleted_user_ids.len(),
                "Cleanup trigger complete"
            );
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(error = %e, "Cleanup trigger failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
