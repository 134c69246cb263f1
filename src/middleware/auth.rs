// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session guard: JWT authentication plus denylist check.
//!
//! Checks run cheapest first: token presence, signing secret, signature
//! and expiry, and only then the revocation lookup in the store. A
//! revoked token is rejected even when its signature and expiry are fine.

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::services::token::{verify_token, TokenError};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Fallback header carrying a bare token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    /// The exact token string that authenticated this request
    pub token: String,
}

/// Pull the session token from `Authorization: Bearer`, falling back to
/// `x-access-token`.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let token = bearer.or_else(|| {
        headers
            .get(ACCESS_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    })?;

    Some(token.to_string())
}

/// Authenticate a request from its headers.
pub async fn authenticate(
    headers: &HeaderMap,
    signing_key: Option<&[u8]>,
    store: &dyn CredentialStore,
    now: DateTime<Utc>,
) -> Result<AuthUser, AppError> {
    let token = extract_token(headers).ok_or(AppError::MissingToken)?;

    let claims = verify_token(&token, signing_key, now).map_err(|err| {
        match err {
            TokenError::Expired => tracing::debug!("Rejected expired token"),
            TokenError::Invalid => tracing::debug!("Rejected invalid token"),
            _ => {}
        }
        AppError::from(err)
    })?;

    if store.find_revocation(&token).await? {
        tracing::warn!(user_id = %claims.sub, "Rejected revoked token");
        return Err(AppError::TokenRevoked);
    }

    Ok(AuthUser {
        user_id: claims.sub,
        token,
    })
}

/// Middleware that requires a valid, unrevoked session token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate(
        request.headers(),
        state.config.jwt_signing_key.as_deref(),
        state.db.as_ref(),
        Utc::now(),
    )
    .await?;

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
