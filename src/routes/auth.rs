// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: registration, login and logout.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::extract_token;
use crate::routes::{json_object, MessageResponse};
use crate::services::accounts;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RegisterResponse {
    pub message: String,
    pub id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: String,
}

/// Register a new account.
async fn register(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let payload = json_object(body)?;
    let user = accounts::register(state.db.as_ref(), &payload, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            id: user.id,
        }),
    ))
}

/// Decode `Authorization: Basic base64(username:password)`.
fn basic_credentials(headers: &HeaderMap) -> Result<(String, String)> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Basic "))
        .ok_or(AppError::Unauthorized)?;

    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(AppError::InvalidCredentials)?;

    let (username, password) = decoded
        .split_once(':')
        .ok_or(AppError::InvalidCredentials)?;

    Ok((username.to_string(), password.to_string()))
}

/// Log in with HTTP Basic credentials and receive a session token.
async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LoginResponse>> {
    let (username, password) = basic_credentials(&headers)?;

    let issued = accounts::login(
        state.db.as_ref(),
        state.config.jwt_signing_key.as_deref(),
        &username,
        &password,
        Utc::now(),
    )
    .await?;

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: format_utc_rfc3339(issued.expires_at),
    }))
}

/// Revoke the presented token.
///
/// Not behind the session guard: logging out with an already-revoked but
/// unexpired token succeeds again.
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>> {
    let token = extract_token(&headers).ok_or(AppError::MissingToken)?;

    accounts::logout(
        state.db.as_ref(),
        state.config.jwt_signing_key.as_deref(),
        &token,
        Utc::now(),
    )
    .await?;

    Ok(Json(MessageResponse {
        message: "Logout successful".to_string(),
    }))
}
