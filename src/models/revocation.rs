// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Denylist entries for tokens revoked before their natural expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A revoked session token.
///
/// Stored at `revoked_tokens/{token_digest}`. The digest stands in for the
/// exact token string: equal strings and only equal strings share a digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedToken {
    /// SHA-256 of the raw token string (hex)
    pub token_digest: String,
    /// The token's own `exp`; after this the entry is redundant
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub expires_at: DateTime<Utc>,
    /// When the token was revoked (RFC 3339)
    pub revoked_at: String,
}

impl RevokedToken {
    pub fn new(token: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            token_digest: token_digest(token),
            expires_at,
            revoked_at: crate::time_utils::format_utc_rfc3339(now),
        }
    }
}

/// Lookup key for a raw token string.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
