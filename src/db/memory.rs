// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for local development and tests.
//!
//! Each map entry is locked for the duration of a conditional update or
//! delete, which gives the same per-document atomicity as Firestore.
//! Usernames and emails are claimed through their own index maps so two
//! concurrent inserts cannot both take the same value.

use crate::db::CredentialStore;
use crate::error::AppError;
use crate::models::event::sort_by_start;
use crate::models::revocation::token_digest;
use crate::models::user::{EMAIL_TAKEN, USERNAME_TAKEN};
use crate::models::{Event, EventPatch, RevokedToken, TimeWindow, UpdateOutcome, User};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    /// username -> user ID
    usernames: DashMap<String, String>,
    /// email -> user ID
    emails: DashMap<String, String>,
    revoked: DashMap<String, RevokedToken>,
    events: DashMap<String, Event>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let Some(user_id) = self.usernames.get(username).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let Some(user_id) = self.emails.get(email).map(|id| id.value().clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&user_id).map(|u| u.value().clone()))
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => return Err(AppError::Conflict(USERNAME_TAKEN.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                self.usernames.remove(&user.username);
                return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn insert_revocation(&self, entry: &RevokedToken) -> Result<(), AppError> {
        self.revoked
            .insert(entry.token_digest.clone(), entry.clone());
        Ok(())
    }

    async fn find_revocation(&self, token: &str) -> Result<bool, AppError> {
        Ok(self.revoked.contains_key(&token_digest(token)))
    }

    async fn prune_revocations(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let before = self.revoked.len();
        self.revoked.retain(|_, entry| entry.expires_at > now);
        Ok(before - self.revoked.len())
    }

    async fn find_event_by_id(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        Ok(self.events.get(event_id).map(|e| e.value().clone()))
    }

    async fn find_events_by_owner(
        &self,
        owner_id: &str,
        window: TimeWindow,
    ) -> Result<Vec<Event>, AppError> {
        let mut events: Vec<Event> = self
            .events
            .iter()
            .filter(|e| e.owner_id == owner_id && window.overlaps(e.start, e.end))
            .map(|e| e.value().clone())
            .collect();
        sort_by_start(&mut events);
        Ok(events)
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        self.events.insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn update_event(
        &self,
        event_id: &str,
        owner_id: &str,
        patch: &EventPatch,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, AppError> {
        let Some(mut event) = self.events.get_mut(event_id) else {
            return Ok(UpdateOutcome::default());
        };
        if event.owner_id != owner_id {
            return Ok(UpdateOutcome::default());
        }

        let changed = patch.apply(&mut event)?;
        if changed {
            event.updated_at = format_utc_rfc3339(now);
        }

        Ok(UpdateOutcome {
            matched: 1,
            modified: u64::from(changed),
        })
    }

    async fn delete_event(&self, event_id: &str, owner_id: &str) -> Result<u64, AppError> {
        let removed = self
            .events
            .remove_if(event_id, |_, event| event.owner_id == owner_id);
        Ok(u64::from(removed.is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind;
    use crate::services::events::ValidationError;
    use chrono::{Duration, TimeZone};

    const OWNER: &str = "0123456789abcdef01234567";
    const OTHER: &str = "ffffffffffffffffffffffff";

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, h, 0, 0).unwrap()
    }

    fn event(id: &str, owner: &str, start: u32, end: u32) -> Event {
        Event {
            id: id.to_string(),
            owner_id: owner.to_string(),
            kind: EventKind::Standard,
            title: format!("Event {}", id),
            description: None,
            start: at(start),
            end: at(end),
            location: None,
            workout_id: None,
            created_at: "2026-05-01T00:00:00Z".to_string(),
            updated_at: "2026-05-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_owner_query_is_filtered_and_sorted() {
        let store = MemoryStore::new();
        store.insert_event(&event("c", OWNER, 14, 15)).await.unwrap();
        store.insert_event(&event("a", OWNER, 8, 9)).await.unwrap();
        store.insert_event(&event("b", OWNER, 10, 11)).await.unwrap();
        store.insert_event(&event("d", OTHER, 10, 11)).await.unwrap();

        let all = store
            .find_events_by_owner(OWNER, TimeWindow::default())
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let window = TimeWindow::new(Some(at(9)), Some(at(14)));
        let some = store.find_events_by_owner(OWNER, window).await.unwrap();
        let ids: Vec<&str> = some.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["b"]);
    }

    #[tokio::test]
    async fn test_conditional_update() {
        let store = MemoryStore::new();
        store.insert_event(&event("a", OWNER, 8, 9)).await.unwrap();
        let patch = EventPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };

        let foreign = store.update_event("a", OTHER, &patch, at(12)).await.unwrap();
        assert_eq!(foreign, UpdateOutcome::default());

        let missing = store.update_event("zz", OWNER, &patch, at(12)).await.unwrap();
        assert_eq!(missing, UpdateOutcome::default());

        let first = store.update_event("a", OWNER, &patch, at(12)).await.unwrap();
        assert_eq!(first, UpdateOutcome { matched: 1, modified: 1 });

        let again = store.update_event("a", OWNER, &patch, at(13)).await.unwrap();
        assert_eq!(again, UpdateOutcome { matched: 1, modified: 0 });

        let stored = store.find_event_by_id("a").await.unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.updated_at, "2026-05-04T12:00:00Z");
    }

    #[tokio::test]
    async fn test_update_rechecks_ordering_against_stored_event() {
        let store = MemoryStore::new();
        store.insert_event(&event("a", OWNER, 10, 11)).await.unwrap();

        // Each patch is valid against the 10:00-11:00 original.
        let shorten = EventPatch {
            end: Some(at(10) + Duration::minutes(30)),
            ..Default::default()
        };
        let push_start = EventPatch {
            start: Some(at(10) + Duration::minutes(45)),
            ..Default::default()
        };

        let first = store.update_event("a", OWNER, &shorten, at(12)).await.unwrap();
        assert_eq!(first, UpdateOutcome { matched: 1, modified: 1 });

        let second = store.update_event("a", OWNER, &push_start, at(12)).await;
        assert!(matches!(
            second,
            Err(AppError::Validation(ValidationError::Ordering))
        ));

        let stored = store.find_event_by_id("a").await.unwrap().unwrap();
        assert_eq!(stored.start, at(10));
        assert_eq!(stored.end, at(10) + Duration::minutes(30));
    }

    #[tokio::test]
    async fn test_conditional_delete() {
        let store = MemoryStore::new();
        store.insert_event(&event("a", OWNER, 8, 9)).await.unwrap();

        assert_eq!(store.delete_event("a", OTHER).await.unwrap(), 0);
        assert_eq!(store.delete_event("a", OWNER).await.unwrap(), 1);
        assert_eq!(store.delete_event("a", OWNER).await.unwrap(), 0);
        assert!(store.find_event_by_id("a").await.unwrap().is_none());
    }

    fn user(id: &str, username: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            name: "Someone".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            created_at: "2026-05-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_user_claims_username_and_email() {
        let store = MemoryStore::new();
        store.insert_user(&user("1", "ada", "ada@example.com")).await.unwrap();

        let err = store
            .insert_user(&user("2", "ada", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg == USERNAME_TAKEN));

        let err = store
            .insert_user(&user("3", "grace", "ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg == EMAIL_TAKEN));

        // The failed email claim released "grace".
        store.insert_user(&user("4", "grace", "grace@example.com")).await.unwrap();

        assert_eq!(store.find_user_by_username("ada").await.unwrap().unwrap().id, "1");
        assert_eq!(store.find_user_by_email("grace@example.com").await.unwrap().unwrap().id, "4");
        assert!(store.find_user_by_id("2").await.unwrap().is_none());
        assert!(store.find_user_by_id("3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revocations_are_idempotent_and_prunable() {
        let store = MemoryStore::new();
        let entry = RevokedToken::new("tok.en.one", at(10), at(9));

        store.insert_revocation(&entry).await.unwrap();
        store.insert_revocation(&entry).await.unwrap();
        store
            .insert_revocation(&RevokedToken::new("tok.en.two", at(12), at(9)))
            .await
            .unwrap();

        assert!(store.find_revocation("tok.en.one").await.unwrap());
        assert!(!store.find_revocation("tok.en.three").await.unwrap());

        assert_eq!(store.prune_revocations(at(10)).await.unwrap(), 1);
        assert!(!store.find_revocation("tok.en.one").await.unwrap());
        assert!(store.find_revocation("tok.en.two").await.unwrap());
        assert_eq!(
            store.prune_revocations(at(10) + Duration::minutes(1)).await.unwrap(),
            0
        );
    }
}
