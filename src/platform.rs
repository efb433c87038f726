// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Platform access: one lazily established connection per process.
//!
//! The document store and identity service are connected on first use and
//! memoized. Concurrent first callers share a single connection attempt; a
//! failed attempt is not cached, so a later request may try again.

use crate::config::Config;
use crate::db::{DocumentStore, FirestoreDb};
use crate::services::identity::{IdentityProvider, IdentityToolkitClient};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Connected platform capabilities.
#[derive(Clone)]
pub struct PlatformHandle {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

/// Failure to reach a platform service.
#[derive(Debug, thiserror::Error)]
#[error("Failed to connect to {service}: {message}")]
pub struct ConnectionError {
    pub service: &'static str,
    pub message: String,
}

impl ConnectionError {
    pub fn new(service: &'static str, message: impl ToString) -> Self {
        Self {
            service,
            message: message.to_string(),
        }
    }
}

/// Establishes a [`PlatformHandle`].
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    async fn connect(&self) -> Result<PlatformHandle, ConnectionError>;
}

/// Connector for Firestore and Firebase Auth (or their emulators).
pub struct FirebaseConnector {
    project_id: String,
    firestore_emulator_host: Option<String>,
    auth_emulator_host: Option<String>,
}

impl FirebaseConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            project_id: config.gcp_project_id.clone(),
            firestore_emulator_host: config.firestore_emulator_host.clone(),
            auth_emulator_host: config.auth_emulator_host.clone(),
        }
    }
}

#[async_trait]
impl PlatformConnector for FirebaseConnector {
    async fn connect(&self) -> Result<PlatformHandle, ConnectionError> {
        tracing::info!(
            project = %self.project_id,
            firestore_emulator = ?self.firestore_emulator_host,
            auth_emulator = ?self.auth_emulator_host,
            "Initializing platform connection"
        );

        let store = FirestoreDb::new(&self.project_id, self.firestore_emulator_host.as_deref())
            .await
            .map_err(|e| ConnectionError::new("Firestore", e))?;

        let identity = match &self.auth_emulator_host {
            Some(host) => IdentityToolkitClient::new_emulator(&self.project_id, host),
            None => IdentityToolkitClient::new(&self.project_id).await,
        }
        .map_err(|e| ConnectionError::new("Identity Toolkit", e))?;

        Ok(PlatformHandle {
            store: Arc::new(store),
            identity: Arc::new(identity),
        })
    }
}

/// Memoizing façade over a [`PlatformConnector`].
pub struct Platform {
    connector: Box<dyn PlatformConnector>,
    handle: OnceCell<PlatformHandle>,
}

impl Platform {
    pub fn new(connector: impl PlatformConnector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            handle: OnceCell::new(),
        }
    }

    /// Façade that is already connected to `handle`.
    pub fn from_handle(handle: PlatformHandle) -> Self {
        Self {
            connector: Box::new(AlreadyConnected),
            handle: OnceCell::new_with(Some(handle)),
        }
    }

    /// Return the connection, establishing it on first use.
    pub async fn ensure_initialized(&self) -> Result<&PlatformHandle, ConnectionError> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle);
        }

        let handle = self
            .handle
            .get_or_try_init(|| self.connector.connect())
            .await?;

        tracing::info!("Platform connection initialized");
        Ok(handle)
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.initialized()
    }
}

struct AlreadyConnected;

#[async_trait]
impl PlatformConnector for AlreadyConnected {
    async fn connect(&self) -> Result<PlatformHandle, ConnectionError> {
        Err(ConnectionError::new(
            "platform",
            "pre-connected façade was asked to reconnect",
        ))
    }
}
