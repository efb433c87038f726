// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Catalog Functions API Server
//!
//! Serves the `createUser` / `createProduct` callables and the scheduled
//! cleanup of inactive users.

use catalog_functions::{
    config::Config,
    platform::{FirebaseConnector, Platform},
    services::{scheduler, DailySchedule, GoogleOidcVerifier, IdTokenVerifier},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        project = %config.gcp_project_id,
        "Starting Catalog Functions API"
    );

    // Connection is established lazily on the first request
    let platform = Arc::new(Platform::new(FirebaseConnector::new(&config)));

    let id_token_verifier = IdTokenVerifier::new(&config)?;
    let scheduler_verifier = GoogleOidcVerifier::new(&config)?;

    let schedule = DailySchedule::parse(&config.cleanup_schedule)?;
    if config.internal_scheduler {
        tracing::info!(schedule = %config.cleanup_schedule, "Starting in-process cleanup scheduler");
        scheduler::spawn_daily_cleanup(platform.clone(), schedule, config.retention_days);
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        platform,
        id_token_verifier,
        scheduler_verifier,
    });

    // Build router
    let app = catalog_functions::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("catalog_functions=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
