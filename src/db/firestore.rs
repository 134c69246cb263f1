// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore implementation of [`CredentialStore`].
//!
//! Collections:
//! - `users` (account records, keyed by user ID)
//! - `usernames`, `emails` (uniqueness claims, keyed by [`claim_key`])
//! - `revoked_tokens` (denylist, keyed by token digest)
//! - `events` (calendar events, keyed by event ID)

use crate::db::{collections, CredentialStore};
use crate::error::AppError;
use crate::models::event::sort_by_start;
use crate::models::revocation::token_digest;
use crate::models::user::{claim_key, UniqueClaim, EMAIL_TAKEN, USERNAME_TAKEN};
use crate::models::{Event, EventPatch, RevokedToken, TimeWindow, UpdateOutcome, User};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::{
    FirestoreConsistencySelector, FirestoreQueryDirection, FirestoreTimestamp,
    FirestoreTransaction,
};

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Abandon a transaction. A failed rollback only delays lock release, so it
/// is logged rather than returned.
async fn rollback(transaction: FirestoreTransaction<'_>) {
    if let Err(e) = transaction.rollback().await {
        tracing::warn!(error = %e, "Failed to roll back transaction");
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    async fn find_user_by_field(&self, field: &str, value: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.for_all([q.field(field).eq(value)]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = self
                .client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                self.client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }

    /// Whether `value` is already claimed in `collection`, read inside an
    /// open transaction so a concurrent claim aborts one of the commits.
    async fn claim_exists(
        &self,
        transaction: &FirestoreTransaction<'_>,
        collection: &str,
        value: &str,
    ) -> Result<bool, AppError> {
        let claim: Option<UniqueClaim> = self
            .client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(&claim_key(value))
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read claim in transaction: {}", e))
            })?;

        Ok(claim.is_some())
    }

    /// Read an event inside an open transaction and keep it only if owned.
    async fn owned_event(
        &self,
        transaction: &FirestoreTransaction<'_>,
        event_id: &str,
        owner_id: &str,
    ) -> Result<Option<Event>, AppError> {
        let current: Option<Event> = self
            .client
            .clone_with_consistency_selector(FirestoreConsistencySelector::Transaction(
                transaction.transaction_id().clone(),
            ))
            .fluent()
            .select()
            .by_id_in(collections::EVENTS)
            .obj()
            .one(event_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read event in transaction: {}", e))
            })?;

        Ok(current.filter(|event| event.owner_id == owner_id))
    }
}

#[async_trait]
impl CredentialStore for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_user_by_field("username", username).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_user_by_field("email", email).await
    }

    async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Writes the user together with its username and email claims. A
    /// value already claimed, or claimed by a transaction that commits
    /// first, yields `Conflict`.
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        if self
            .claim_exists(&transaction, collections::USERNAMES, &user.username)
            .await?
        {
            rollback(transaction).await;
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }
        if self
            .claim_exists(&transaction, collections::EMAILS, &user.email)
            .await?
        {
            rollback(transaction).await;
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let claim = UniqueClaim {
            user_id: user.id.clone(),
        };
        for (collection, value) in [
            (collections::USERNAMES, &user.username),
            (collections::EMAILS, &user.email),
        ] {
            self.client
                .fluent()
                .update()
                .in_col(collection)
                .document_id(claim_key(value))
                .object(&claim)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add claim to transaction: {}", e))
                })?;
        }
        self.client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add user to transaction: {}", e)))?;

        if let Err(e) = transaction.commit().await {
            tracing::debug!(error = %e, "User insert lost a race, rechecking claims");
            if self.find_user_by_username(&user.username).await?.is_some() {
                return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
            }
            if self.find_user_by_email(&user.email).await?.is_some() {
                return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
            }
            return Err(AppError::Database(format!("Transaction commit failed: {}", e)));
        }

        Ok(())
    }

    // ─── Revocation Operations ───────────────────────────────────

    async fn insert_revocation(&self, entry: &RevokedToken) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::REVOKED_TOKENS)
            .document_id(&entry.token_digest)
            .object(entry)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn find_revocation(&self, token: &str) -> Result<bool, AppError> {
        let entry: Option<RevokedToken> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::REVOKED_TOKENS)
            .obj()
            .one(&token_digest(token))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(entry.is_some())
    }

    async fn prune_revocations(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let expired: Vec<RevokedToken> = self
            .client
            .fluent()
            .select()
            .from(collections::REVOKED_TOKENS)
            .filter(|q| {
                q.for_all([q
                    .field("expires_at")
                    .less_than_or_equal(FirestoreTimestamp(now))])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = expired.len();
        self.batch_delete(&expired, collections::REVOKED_TOKENS, |entry: &RevokedToken| {
            entry.token_digest.clone()
        })
        .await?;

        Ok(count)
    }

    // ─── Event Operations ────────────────────────────────────────

    async fn find_event_by_id(&self, event_id: &str) -> Result<Option<Event>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::EVENTS)
            .obj()
            .one(event_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// `start < to` is pushed down to Firestore; `end > from` is applied
    /// here since a single query can only range-filter on one field
    /// without a composite index.
    async fn find_events_by_owner(
        &self,
        owner_id: &str,
        window: TimeWindow,
    ) -> Result<Vec<Event>, AppError> {
        let owner_id = owner_id.to_string();
        let to = window.to;

        let mut events: Vec<Event> = self
            .client
            .fluent()
            .select()
            .from(collections::EVENTS)
            .filter(move |q| {
                q.for_all([
                    q.field("owner_id").eq(owner_id.clone()),
                    to.and_then(|to| q.field("start").less_than(FirestoreTimestamp(to))),
                ])
            })
            .order_by([("start", FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        events.retain(|event| window.overlaps(event.start, event.end));
        sort_by_start(&mut events);
        Ok(events)
    }

    async fn insert_event(&self, event: &Event) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::EVENTS)
            .document_id(&event.id)
            .object(event)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Read-check-write inside one transaction. If another writer touches
    /// the document first, the commit fails instead of overwriting.
    async fn update_event(
        &self,
        event_id: &str,
        owner_id: &str,
        patch: &EventPatch,
        now: DateTime<Utc>,
    ) -> Result<UpdateOutcome, AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let Some(mut event) = self.owned_event(&transaction, event_id, owner_id).await? else {
            rollback(transaction).await;
            return Ok(UpdateOutcome::default());
        };

        // Ordering is checked against the event as read in this transaction.
        let changed = match patch.apply(&mut event) {
            Ok(changed) => changed,
            Err(err) => {
                rollback(transaction).await;
                return Err(err.into());
            }
        };
        if !changed {
            rollback(transaction).await;
            return Ok(UpdateOutcome {
                matched: 1,
                modified: 0,
            });
        }
        event.updated_at = format_utc_rfc3339(now);

        self.client
            .fluent()
            .update()
            .in_col(collections::EVENTS)
            .document_id(event_id)
            .object(&event)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add event to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(UpdateOutcome {
            matched: 1,
            modified: 1,
        })
    }

    async fn delete_event(&self, event_id: &str, owner_id: &str) -> Result<u64, AppError> {
        let mut transaction = self
            .client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        if self.owned_event(&transaction, event_id, owner_id).await?.is_none() {
            rollback(transaction).await;
            return Ok(0);
        }

        self.client
            .fluent()
            .delete()
            .from(collections::EVENTS)
            .document_id(event_id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add deletion to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(1)
    }
}
