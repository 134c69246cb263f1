// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Document identifiers.
//!
//! Users and events are keyed by 12 random bytes rendered as 24 lowercase
//! hex characters.

use ring::rand::{SecureRandom, SystemRandom};

/// Length of a rendered identifier.
pub const ID_LEN: usize = 24;

/// Hex-encode `len` bytes from the system CSPRNG.
pub fn random_hex(len: usize) -> anyhow::Result<String> {
    let mut bytes = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| anyhow::anyhow!("system random source unavailable"))?;
    Ok(hex::encode(bytes))
}

/// Generate a fresh document identifier.
pub fn new_id() -> anyhow::Result<String> {
    random_hex(ID_LEN / 2)
}

/// Parse a client-supplied identifier, normalizing to lowercase.
pub fn parse_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() == ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(raw.to_ascii_lowercase())
    } else {
        None
    }
}
