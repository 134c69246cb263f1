// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const USERNAME_TAKEN: &str = "Username already taken";
pub const EMAIL_TAKEN: &str = "An account already exists with this email";

/// User account stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Login name (unique, case-sensitive)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Argon2 PHC string; never the plaintext
    pub password_hash: String,
    /// When the account was registered (RFC 3339)
    pub created_at: String,
}

/// Marker that reserves a username or email for one account.
///
/// Stored at `usernames/{claim_key}` and `emails/{claim_key}`; created only
/// if absent, in the same transaction as the user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueClaim {
    pub user_id: String,
}

/// Document ID for a claimed value. Usernames may contain `/`, which
/// Firestore does not allow in an ID.
pub fn claim_key(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_key_is_path_safe() {
        let key = claim_key("a/b");
        assert_eq!(key.len(), 64);
        assert!(!key.contains('/'));
        assert_ne!(claim_key("Ada"), claim_key("ada"));
    }
}
