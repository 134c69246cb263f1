// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token issuance and verification (HS256 JWT).
//!
//! Both operations take the current time explicitly so that expiry is
//! checked against a caller-supplied clock with no leeway. Revocation is
//! not checked here; see `middleware::auth`.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// How long a freshly issued token stays valid.
pub const TOKEN_TTL_MINUTES: i64 = 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Random nonce; two logins within the same second must not yield the
    /// same token string, or revoking one would revoke both.
    pub jti: String,
}

impl Claims {
    /// Expiry as a UTC timestamp.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A signed token together with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("no signing secret configured")]
    MissingSecret,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed or has an invalid signature")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Encoding(String),
}

/// Create a session token for `user_id`, valid for [`TOKEN_TTL_MINUTES`].
pub fn issue_token(
    user_id: &str,
    secret: Option<&[u8]>,
    now: DateTime<Utc>,
) -> Result<IssuedToken, TokenError> {
    let secret = secret.ok_or(TokenError::MissingSecret)?;
    let expires_at = now + Duration::minutes(TOKEN_TTL_MINUTES);

    let jti = crate::ids::random_hex(16).map_err(|e| TokenError::Encoding(e.to_string()))?;

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        jti,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| TokenError::Encoding(e.to_string()))?;

    Ok(IssuedToken { token, expires_at })
}

/// Check signature, structure and expiry of `token`.
pub fn verify_token(
    token: &str,
    secret: Option<&[u8]>,
    now: DateTime<Utc>,
) -> Result<Claims, TokenError> {
    let secret = secret.ok_or(TokenError::MissingSecret)?;

    let mut validation = Validation::new(Algorithm::HS256);
    // Expiry is compared against `now` below, not the system clock.
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|_| TokenError::Invalid)?;

    if now.timestamp() >= token_data.claims.exp {
        return Err(TokenError::Expired);
    }

    Ok(token_data.claims)
}
