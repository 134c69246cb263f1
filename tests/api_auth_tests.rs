// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept requests with valid tokens
//! 3. CORS preflight requests return correct headers

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use fitcal::config::Config;
use fitcal::services::token::issue_token;
use tower::ServiceExt;

mod common;
use common::{create_test_app, create_test_app_with, request, send, signed_in};

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, request("GET", "/api/events", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _) = create_test_app();

    let (status, body) = send(
        &app,
        request("GET", "/api/events", Some("invalid.token.here"), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn test_protected_route_with_expired_token() {
    let (app, state) = create_test_app();
    let (user_id, _) = signed_in(&app, "expired").await;

    let stale = issue_token(
        &user_id,
        state.config.jwt_signing_key.as_deref(),
        Utc::now() - Duration::hours(2),
    )
    .unwrap();

    let (status, body) = send(&app, request("GET", "/api/me", Some(&stale.token), None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_expired");
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let (app, _) = create_test_app();
    let (user_id, token) = signed_in(&app, "valid").await;

    let (status, body) = send(&app, request("GET", "/api/me", Some(&token), None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], user_id.as_str());
    assert_eq!(body["username"], "valid");
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_access_token_header_fallback() {
    let (app, _) = create_test_app();
    let (_, token) = signed_in(&app, "fallback").await;

    let (status, _) = send(
        &app,
        Request::builder()
            .method("GET")
            .uri("/api/me")
            .header("x-access-token", &token)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_missing_secret_is_server_error() {
    let mut config = Config::test_default();
    config.jwt_signing_key = None;
    let (app, _) = create_test_app_with(config);

    let (status, body) = send(&app, request("GET", "/api/events", Some("a.b.c"), None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "configuration_error");
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/events")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_cors_rejects_other_origin() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/events")
                .header(header::ORIGIN, "https://evil.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(!response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _) = create_test_app();

    let (status, body) = send(&app, request("GET", "/health", None, None)).await;

    // Health should be accessible without auth
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
