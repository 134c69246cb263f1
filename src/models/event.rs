// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar event model, owner-scoped patches and time windows.

use crate::services::events::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// What an event represents on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum EventKind {
    Standard,
    Workout,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Standard, EventKind::Workout];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Standard => "STANDARD",
            EventKind::Workout => "WORKOUT",
        }
    }

    /// Exact match after trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

/// Stored event record.
///
/// Stored at `events/{id}`. `start < end` holds for every stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Document ID
    pub id: String,
    /// Owning user ID
    pub owner_id: String,
    pub kind: EventKind,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub start: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    /// Linked workout; set at creation, afterwards only clearable
    pub workout_id: Option<String>,
    /// Creation time (RFC 3339)
    pub created_at: String,
    /// Last modification time (RFC 3339)
    pub updated_at: String,
}

/// Validated set of changes to apply to an existing event.
///
/// `None` leaves a field untouched. For the optional fields,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPatch {
    pub kind: Option<EventKind>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub location: Option<Option<String>>,
    /// There is no way to set a workout link, only to drop it.
    pub clear_workout: bool,
}

impl EventPatch {
    /// Apply to `event` in place; returns whether any field changed.
    ///
    /// The result must still satisfy `start < end`. On error `event` is
    /// left untouched.
    pub fn apply(&self, event: &mut Event) -> Result<bool, ValidationError> {
        let mut next = event.clone();

        if let Some(kind) = self.kind {
            next.kind = kind;
        }
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(start) = self.start {
            next.start = start;
        }
        if let Some(end) = self.end {
            next.end = end;
        }
        if let Some(location) = &self.location {
            next.location = location.clone();
        }
        if self.clear_workout {
            next.workout_id = None;
        }

        if next.end <= next.start {
            return Err(ValidationError::Ordering);
        }

        let changed = next != *event;
        *event = next;
        Ok(changed)
    }
}

/// Result of an owner-scoped conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Documents whose `(id, owner)` matched
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
}

/// Half-open query window; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    /// `start < to && end > from`: touching at a boundary is not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.to.map_or(true, |to| start < to) && self.from.map_or(true, |from| end > from)
    }
}

/// Ascending by start, ties broken by ID so ordering is total.
pub fn sort_by_start(events: &mut [Event]) {
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
}
