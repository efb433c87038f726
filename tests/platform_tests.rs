// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lazy platform connection tests.

use async_trait::async_trait;
use catalog_functions::platform::{ConnectionError, Platform, PlatformConnector, PlatformHandle};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{handle_for, recording_platform};

/// Connector that counts attempts and can be told to fail.
struct CountingConnector {
    attempts: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    handle: PlatformHandle,
}

#[async_trait]
impl PlatformConnector for CountingConnector {
    async fn connect(&self) -> Result<PlatformHandle, ConnectionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ConnectionError::new("Firestore", "connection refused"));
        }
        Ok(self.handle.clone())
    }
}

fn counting_platform() -> (Platform, Arc<AtomicUsize>, Arc<AtomicBool>) {
    let (store, identity, _) = recording_platform();
    let attempts = Arc::new(AtomicUsize::new(0));
    let fail = Arc::new(AtomicBool::new(false));
    let platform = Platform::new(CountingConnector {
        attempts: attempts.clone(),
        fail: fail.clone(),
        handle: handle_for(&store, &identity),
    });
    (platform, attempts, fail)
}

#[tokio::test]
async fn test_connection_is_lazy() {
    let (platform, attempts, _) = counting_platform();

    assert!(!platform.is_initialized());
    assert_eq!(attempts.load(Ordering::SeqCst), 0);

    platform.ensure_initialized().await.unwrap();

    assert!(platform.is_initialized());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_repeated_calls_connect_once() {
    let (platform, attempts, _) = counting_platform();

    for _ in 0..5 {
        platform.ensure_initialized().await.unwrap();
    }

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_first_calls_connect_once() {
    let (platform, attempts, _) = counting_platform();
    let platform = Arc::new(platform);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let platform = platform.clone();
            tokio::spawn(async move { platform.ensure_initialized().await.is_ok() })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap());
    }

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_connection_is_retried() {
    let (platform, attempts, fail) = counting_platform();
    fail.store(true, Ordering::SeqCst);

    let err = platform.ensure_initialized().await.err().unwrap();
    assert_eq!(err.service, "Firestore");
    assert_eq!(
        err.to_string(),
        "Failed to connect to Firestore: connection refused"
    );
    assert!(!platform.is_initialized());

    fail.store(false, Ordering::SeqCst);
    platform.ensure_initialized().await.unwrap();

    assert!(platform.is_initialized());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_preconnected_platform_shares_handle() {
    let (store, identity, _) = recording_platform();
    let platform = Platform::from_handle(handle_for(&store, &identity));

    assert!(platform.is_initialized());
    let handle = platform.ensure_initialized().await.unwrap();
    handle.identity.delete_identity("u1").await.unwrap();

    assert_eq!(identity.deleted(), vec!["u1"]);
}
