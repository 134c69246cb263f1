// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration, login and logout.

use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::ids;
use crate::models::user::{EMAIL_TAKEN, USERNAME_TAKEN};
use crate::models::{RevokedToken, User};
use crate::services::events::{FieldErrors, ValidationError};
use crate::services::password::{hash_password, verify_password};
use crate::services::token::{issue_token, verify_token, IssuedToken};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use validator::ValidateEmail;

const REGISTRATION_FIELDS: [&str; 4] = ["name", "username", "email", "password"];

/// A validated registration payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Check that every registration field is a non-empty string.
///
/// `name`, `username` and `email` are trimmed; the password is kept as
/// typed.
pub fn validate_registration(
    payload: &Map<String, Value>,
) -> std::result::Result<Registration, ValidationError> {
    let mut errors = FieldErrors::default();
    let mut values = Vec::with_capacity(REGISTRATION_FIELDS.len());

    for field in REGISTRATION_FIELDS {
        let value = match payload.get(field) {
            None | Some(Value::Null) => {
                errors.add(field, "required");
                String::new()
            }
            Some(Value::String(s)) if !s.trim().is_empty() => {
                if field == "password" {
                    s.clone()
                } else {
                    s.trim().to_string()
                }
            }
            Some(_) => {
                errors.add(field, "must be a non-empty string");
                String::new()
            }
        };
        values.push(value);
    }

    if errors.get("email").is_none() && !values[2].validate_email() {
        errors.add("email", "must be a valid email address");
    }

    if !errors.is_empty() {
        return Err(ValidationError::Fields(errors));
    }

    let mut values = values.into_iter();
    let mut next = || values.next().unwrap_or_default();
    Ok(Registration {
        name: next(),
        username: next(),
        email: next(),
        password: next(),
    })
}

/// Create an account. Username is checked for uniqueness before email.
pub async fn register(
    store: &dyn CredentialStore,
    payload: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<User> {
    let registration = validate_registration(payload)?;

    if store
        .find_user_by_username(&registration.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
    }
    if store
        .find_user_by_email(&registration.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
    }

    let user = User {
        id: ids::new_id()?,
        name: registration.name,
        username: registration.username,
        email: registration.email,
        password_hash: hash_password(&registration.password)?,
        created_at: format_utc_rfc3339(now),
    };
    store.insert_user(&user).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok(user)
}

/// Check credentials and issue a session token.
///
/// Unknown username and wrong password are separate 401 errors.
pub async fn login(
    store: &dyn CredentialStore,
    signing_key: Option<&[u8]>,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<IssuedToken> {
    let Some(user) = store.find_user_by_username(username).await? else {
        tracing::debug!("Login failed: unknown username");
        return Err(AppError::IncorrectUsername);
    };

    if !verify_password(password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "Login failed: wrong password");
        return Err(AppError::IncorrectPassword);
    }

    let issued = issue_token(&user.id, signing_key, now)?;
    tracing::info!(user_id = %user.id, expires_at = %issued.expires_at, "Session started");
    Ok(issued)
}

/// Revoke a still-valid token. Revoking twice succeeds both times.
pub async fn logout(
    store: &dyn CredentialStore,
    signing_key: Option<&[u8]>,
    token: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let claims = verify_token(token, signing_key, now)?;

    store
        .insert_revocation(&RevokedToken::new(token, claims.expires_at(), now))
        .await?;

    tracing::info!(user_id = %claims.sub, "Session revoked");
    Ok(())
}
