// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Security and behavior tests for the Cloud Scheduler cleanup trigger.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use std::sync::atomic::Ordering;
use tower::ServiceExt;

mod common;

fn cleanup_request(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/tasks/cleanup-old-users");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_cleanup_no_header_forbidden() {
    let app = common::create_test_app();
    app.store.set_query_results(&["u1"]);

    let response = app.router.oneshot(cleanup_request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.store.calls().is_empty());
    assert!(app.identity.deleted().is_empty());
}

#[tokio::test]
async fn test_cleanup_with_user_id_token_forbidden() {
    let app = common::create_test_app();
    let token = common::create_test_id_token("u1");

    let response = app
        .router
        .oneshot(cleanup_request(Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_cleanup_wrong_service_account_forbidden() {
    let app = common::create_test_app();
    let token =
        common::create_test_scheduler_jwt(&app.state.config, "intruder@example.iam.gserviceaccount.com");

    let response = app
        .router
        .oneshot(cleanup_request(Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.store.calls().is_empty());
}

#[tokio::test]
async fn test_cleanup_with_scheduler_token_runs() {
    let app = common::create_test_app();
    app.store.set_query_results(&["stale-1", "stale-2"]);
    let token = common::create_test_scheduler_jwt(
        &app.state.config,
        &app.state.config.scheduler_service_account,
    );

    let response = app
        .router
        .oneshot(cleanup_request(Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let mut deleted = app.identity.deleted();
    deleted.sort();
    assert_eq!(deleted, vec!["stale-1", "stale-2"]);
    assert_eq!(
        app.events.lock().unwrap().last().map(String::as_str),
        Some("commit")
    );
}

#[tokio::test]
async fn test_cleanup_failure_returns_server_error() {
    let app = common::create_test_app();
    app.store.fail_query.store(true, Ordering::SeqCst);
    let token = common::create_test_scheduler_jwt(
        &app.state.config,
        &app.state.config.scheduler_service_account,
    );

    let response = app
        .router
        .oneshot(cleanup_request(Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.identity.deleted().is_empty());
}
