// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Event validation and owner-scoped event operations.
//!
//! `validate_create` and `validate_edit` are pure: they turn a JSON
//! payload into a normalized event or patch and never touch storage. The
//! async functions below combine them with a [`CredentialStore`].
//!
//! Every path that would reveal whether another user's event exists
//! returns [`AppError::Forbidden`], the same error as for a missing event.

use crate::db::CredentialStore;
use crate::error::{AppError, Result};
use crate::ids;
use crate::models::{Event, EventKind, EventPatch, TimeWindow};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

const REQUIRED: &str = "required";
const NON_EMPTY_STRING: &str = "must be a non-empty string";
const BAD_KIND: &str = "must be one of STANDARD, WORKOUT";
const BAD_TIMESTAMP: &str = "must be an RFC 3339 timestamp with a UTC offset";
const BAD_REFERENCE: &str = "must be a 24-character hex identifier";
const NOT_EDITABLE: &str = "is not an editable field";
const STRING_OR_NULL: &str = "must be a non-empty string or null";
const CLEAR_ONLY: &str = "can only be cleared (set to null)";

/// Per-field validation failures, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, reason: &str) {
        self.0.insert(field.to_string(), reason.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "{}", names.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid or missing fields: {0}")]
    Fields(FieldErrors),

    #[error("end must be after start")]
    Ordering,

    #[error("No fields to update")]
    EmptyPatch,
}

/// Parse a timezone-aware timestamp; a trailing `Z` means UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

// ─── Creation ────────────────────────────────────────────────

/// A validated, normalized creation payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub kind: EventKind,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub workout_id: Option<String>,
}

impl NewEvent {
    pub fn into_event(self, id: String, owner_id: String, now: DateTime<Utc>) -> Event {
        let now = format_utc_rfc3339(now);
        Event {
            id,
            owner_id,
            kind: self.kind,
            title: self.title,
            description: self.description,
            start: self.start,
            end: self.end,
            location: self.location,
            workout_id: self.workout_id,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Validate a creation payload.
///
/// Missing or malformed required fields are all reported together. The
/// ordering check runs only once every field parsed. Malformed optional
/// text fields degrade to absent; a malformed `workout_id` is an error.
pub fn validate_create(payload: &Map<String, Value>) -> std::result::Result<NewEvent, ValidationError> {
    let mut errors = FieldErrors::default();

    let present = |name: &str| payload.get(name).filter(|v| !v.is_null());

    let title = match present("title") {
        None => {
            errors.add("title", REQUIRED);
            None
        }
        Some(v) => match non_empty_str(v) {
            Some(s) => Some(s.to_string()),
            None => {
                errors.add("title", NON_EMPTY_STRING);
                None
            }
        },
    };

    let kind = match present("kind") {
        None => {
            errors.add("kind", REQUIRED);
            None
        }
        Some(v) => {
            let kind = v.as_str().and_then(EventKind::parse);
            if kind.is_none() {
                errors.add("kind", BAD_KIND);
            }
            kind
        }
    };

    let mut timestamp = |name: &str| match present(name) {
        None => {
            errors.add(name, REQUIRED);
            None
        }
        Some(v) => {
            let parsed = v.as_str().and_then(parse_timestamp);
            if parsed.is_none() {
                errors.add(name, BAD_TIMESTAMP);
            }
            parsed
        }
    };
    let start = timestamp("start");
    let end = timestamp("end");

    let optional_text = |name: &str| payload.get(name).and_then(non_empty_str).map(str::to_string);
    let description = optional_text("description");
    let location = optional_text("location");

    let workout_id = match payload.get("workout_id").and_then(non_empty_str) {
        None => None,
        Some(raw) => {
            let id = ids::parse_id(raw);
            if id.is_none() {
                errors.add("workout_id", BAD_REFERENCE);
            }
            id
        }
    };

    match (kind, title, start, end) {
        (Some(kind), Some(title), Some(start), Some(end)) if errors.is_empty() => {
            if end <= start {
                return Err(ValidationError::Ordering);
            }
            Ok(NewEvent {
                kind,
                title,
                description,
                start,
                end,
                location,
                workout_id,
            })
        }
        _ => Err(ValidationError::Fields(errors)),
    }
}

// ─── Editing ─────────────────────────────────────────────────

/// How a patchable field is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    /// Non-empty after trimming; cannot be cleared.
    RequiredString,
    /// RFC 3339 timestamp; cannot be cleared.
    Date,
    /// Non-empty string, or `null` to clear.
    OptionalString,
    /// Write-once reference: only `null` (unlink) is accepted.
    ImmutableReference,
}

/// Fields a patch may contain.
pub const EDITABLE_FIELDS: [(&str, FieldCategory); 7] = [
    ("kind", FieldCategory::RequiredString),
    ("title", FieldCategory::RequiredString),
    ("start", FieldCategory::Date),
    ("end", FieldCategory::Date),
    ("description", FieldCategory::OptionalString),
    ("location", FieldCategory::OptionalString),
    ("workout_id", FieldCategory::ImmutableReference),
];

fn category_of(field: &str) -> Option<FieldCategory> {
    EDITABLE_FIELDS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, category)| *category)
}

/// Validate an edit payload against the event it targets.
///
/// The ownership gate runs before any field is looked at.
pub fn validate_edit(
    payload: &Map<String, Value>,
    existing: &Event,
    user_id: &str,
) -> Result<EventPatch> {
    if existing.owner_id != user_id {
        return Err(AppError::Forbidden);
    }
    if payload.is_empty() {
        return Err(ValidationError::EmptyPatch.into());
    }

    let mut patch = EventPatch::default();
    let mut errors = FieldErrors::default();

    for (field, value) in payload {
        let Some(category) = category_of(field) else {
            errors.add(field, NOT_EDITABLE);
            continue;
        };

        match category {
            FieldCategory::RequiredString => match (field.as_str(), non_empty_str(value)) {
                ("kind", Some(raw)) => match EventKind::parse(raw) {
                    Some(kind) => patch.kind = Some(kind),
                    None => errors.add(field, BAD_KIND),
                },
                ("kind", None) => errors.add(field, BAD_KIND),
                (_, Some(s)) => patch.title = Some(s.to_string()),
                (_, None) => errors.add(field, NON_EMPTY_STRING),
            },
            FieldCategory::Date => match value.as_str().and_then(parse_timestamp) {
                Some(ts) if field == "start" => patch.start = Some(ts),
                Some(ts) => patch.end = Some(ts),
                None => errors.add(field, BAD_TIMESTAMP),
            },
            FieldCategory::OptionalString => {
                let next = if value.is_null() {
                    Some(None)
                } else {
                    non_empty_str(value).map(|s| Some(s.to_string()))
                };
                match (field.as_str(), next) {
                    ("description", Some(v)) => patch.description = Some(v),
                    (_, Some(v)) => patch.location = Some(v),
                    (_, None) => errors.add(field, STRING_OR_NULL),
                }
            }
            FieldCategory::ImmutableReference => {
                if value.is_null() {
                    patch.clear_workout = true;
                } else {
                    errors.add(field, CLEAR_ONLY);
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(ValidationError::Fields(errors).into());
    }

    let start = patch.start.unwrap_or(existing.start);
    let end = patch.end.unwrap_or(existing.end);
    if end <= start {
        return Err(ValidationError::Ordering.into());
    }

    Ok(patch)
}

/// Parse the optional `from`/`to` bounds of an event listing.
pub fn parse_window(
    from: Option<&str>,
    to: Option<&str>,
) -> std::result::Result<TimeWindow, ValidationError> {
    let mut errors = FieldErrors::default();
    let mut bound = |name: &str, raw: Option<&str>| {
        raw.and_then(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                errors.add(name, BAD_TIMESTAMP);
            }
            parsed
        })
    };
    let from = bound("from", from);
    let to = bound("to", to);

    if !errors.is_empty() {
        return Err(ValidationError::Fields(errors));
    }
    if let (Some(from), Some(to)) = (from, to) {
        if to <= from {
            return Err(ValidationError::Ordering);
        }
    }
    Ok(TimeWindow::new(from, to))
}

// ─── Store-backed operations ─────────────────────────────────

/// Outcome of an edit that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Updated(Event),
    /// Matched the caller's event but every value was already current.
    Unchanged,
}

/// Create an event owned by `user_id`.
pub async fn create_event(
    store: &dyn CredentialStore,
    user_id: &str,
    payload: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<Event> {
    let new_event = validate_create(payload)?;

    if store.find_user_by_id(user_id).await?.is_none() {
        tracing::warn!(user_id, "Rejected event for unknown owner");
        return Err(AppError::Conflict("Unknown owner".to_string()));
    }

    let event = new_event.into_event(ids::new_id()?, user_id.to_string(), now);
    store.insert_event(&event).await?;

    tracing::info!(
        user_id,
        event_id = %event.id,
        kind = event.kind.as_str(),
        "Event created"
    );
    Ok(event)
}

/// Fetch one of the caller's events.
pub async fn fetch_event(store: &dyn CredentialStore, user_id: &str, event_id: &str) -> Result<Event> {
    let id = ids::parse_id(event_id).ok_or(AppError::Forbidden)?;
    match store.find_event_by_id(&id).await? {
        Some(event) if event.owner_id == user_id => Ok(event),
        _ => Err(AppError::Forbidden),
    }
}

/// The caller's events overlapping `window`, ascending by start.
pub async fn list_events(
    store: &dyn CredentialStore,
    user_id: &str,
    window: TimeWindow,
) -> Result<Vec<Event>> {
    store.find_events_by_owner(user_id, window).await
}

/// Validate and apply an edit to one of the caller's events.
pub async fn edit_event(
    store: &dyn CredentialStore,
    user_id: &str,
    event_id: &str,
    payload: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<EditOutcome> {
    let id = ids::parse_id(event_id).ok_or(AppError::Forbidden)?;
    let existing = store
        .find_event_by_id(&id)
        .await?
        .ok_or(AppError::Forbidden)?;

    let patch = validate_edit(payload, &existing, user_id)?;

    let outcome = store.update_event(&id, user_id, &patch, now).await?;
    if outcome.matched == 0 {
        return Err(AppError::Forbidden);
    }
    if outcome.modified == 0 {
        tracing::debug!(user_id, event_id = %id, "Edit matched but changed nothing");
        return Ok(EditOutcome::Unchanged);
    }

    let updated = store
        .find_event_by_id(&id)
        .await?
        .ok_or(AppError::Forbidden)?;
    tracing::info!(user_id, event_id = %id, "Event updated");
    Ok(EditOutcome::Updated(updated))
}

/// Delete one of the caller's events.
pub async fn delete_event(store: &dyn CredentialStore, user_id: &str, event_id: &str) -> Result<()> {
    let id = ids::parse_id(event_id).ok_or(AppError::Forbidden)?;
    if store.delete_event(&id, user_id).await? == 0 {
        return Err(AppError::Forbidden);
    }
    tracing::info!(user_id, event_id = %id, "Event deleted");
    Ok(())
}
