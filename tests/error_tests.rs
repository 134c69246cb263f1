// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use fitcal::error::AppError;
use fitcal::services::{FieldErrors, TokenError, ValidationError};

async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_token_errors_map_to_unauthorized() {
    assert!(matches!(AppError::from(TokenError::Expired), AppError::TokenExpired));
    assert!(matches!(AppError::from(TokenError::Invalid), AppError::InvalidToken));
    assert_eq!(AppError::TokenRevoked.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::MissingToken.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_missing_secret_is_server_side() {
    let err = AppError::from(TokenError::MissingSecret);
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_status_mapping() {
    assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        AppError::Conflict("taken".to_string()).status(),
        StatusCode::CONFLICT
    );
    assert_eq!(
        AppError::from(ValidationError::Ordering).status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        AppError::Database("down".to_string()).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_field_errors_are_listed() {
    let mut errors = FieldErrors::default();
    errors.add("title", "required");
    errors.add("start", "must be an RFC 3339 timestamp with a UTC offset");

    let (status, body) = body_of(ValidationError::Fields(errors).into()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_fields");
    assert_eq!(body["fields"]["title"], "required");
    assert!(body["fields"]["start"].is_string());
}

#[tokio::test]
async fn test_login_failures_have_own_codes() {
    let (status, username) = body_of(AppError::IncorrectUsername).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(username["error"], "incorrect_username");

    let (status, password) = body_of(AppError::IncorrectPassword).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(password["error"], "incorrect_password");

    let (_, malformed) = body_of(AppError::InvalidCredentials).await;
    assert_eq!(malformed["error"], "invalid_credentials");
}

#[tokio::test]
async fn test_internal_details_are_hidden() {
    let (status, body) = body_of(AppError::Database("connection refused at 10.0.0.7".to_string())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (_, body) = body_of(AppError::Internal(anyhow::anyhow!("secret stack"))).await;
    assert_eq!(body["error"], "internal_error");
    assert!(!body.to_string().contains("secret stack"));
}
