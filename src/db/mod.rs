//! Database layer: the storage contract and its backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Event, EventPatch, RevokedToken, TimeWindow, UpdateOutcome, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const USERNAMES: &str = "usernames";
    pub const EMAILS: &str = "emails";
    pub const REVOKED_TOKENS: &str = "revoked_tokens";
    pub const EVENTS: &str = "events";
}

/// Persistence for users, the token denylist and events.
///
/// Event mutations are conditional on `(id, owner)` and must be atomic per
/// document: a caller that does not own the event matches nothing.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AppError>;

    /// Store a new user. Fails with `Conflict` if the username or email is
    /// already taken, even when two inserts race.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    // ─── Revocations ─────────────────────────────────────────────

    /// Add a token to the denylist. Re-adding is a no-op.
    async fn insert_revocation(&self, entry: &RevokedToken) -> Result<(), AppError>;

    /// Whether this exact token string has been revoked.
    async fn find_revocation(&self, token: &str) -> Result<bool, AppError>;

    /// Drop entries whose token expired at or before `now`.
    async fn prune_revocations(&self, now: DateTime<Utc>) -> Result<usize, AppError>;

    // ─── Events ──────────────────────────────────────────────────

    async fn find_event_by_id(&self, event_id: &str) -> Result<Option<Event>, AppError>;

    /// Owner's events overlapping `window`, ascending by start.
    async fn find_events_by_owner(
        &self,
        owner_id: &str,
        window: TimeWindow,
    ) -> Result<Vec<Event>, AppError>;

    async fn insert_event(&self, event: &Event) -> Result<(), AppError>;

    /// Apply `patch` if the event exists and belongs to `owner_id`.
    async fn update_event(
        &self,
        event_id: &str,
        owner_id: &str,
        patch: &EventPatch,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, AppError>;

    /// Delete the event if it belongs to `owner_id`; returns the count deleted.
    async fn delete_event(&self, event_id: &str, owner_id: &str) -> Result<u64, AppError>;
}
