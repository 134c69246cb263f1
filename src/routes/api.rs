// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Event, EventKind};
use crate::routes::json_object;
use crate::services::events::{self, EditOutcome};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/events", get(list_events).post(create_event))
        .route(
            "/api/events/{id}",
            get(get_event).patch(edit_event).delete(delete_event),
        )
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .db
        .find_user_by_id(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(UserResponse {
        id: profile.id,
        name: profile.name,
        username: profile.username,
        email: profile.email,
        created_at: profile.created_at,
    }))
}

// ─── Events ──────────────────────────────────────────────────

/// Event as returned to clients.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventResponse {
    pub id: String,
    pub kind: EventKind,
    pub title: String,
    pub description: Option<String>,
    /// RFC 3339, UTC
    pub start: String,
    /// RFC 3339, UTC
    pub end: String,
    pub location: Option<String>,
    pub workout_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            kind: event.kind,
            title: event.title,
            description: event.description,
            start: format_utc_rfc3339(event.start),
            end: format_utc_rfc3339(event.end),
            location: event.location,
            workout_id: event.workout_id,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreatedEventResponse {
    pub id: String,
    pub event: EventResponse,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EventsResponse {
    pub events: Vec<EventResponse>,
}

/// Optional listing window; both bounds are RFC 3339 timestamps.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Create an event owned by the caller.
async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedEventResponse>)> {
    let payload = json_object(body)?;
    let event = events::create_event(state.db.as_ref(), &user.user_id, &payload, Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedEventResponse {
            id: event.id.clone(),
            event: event.into(),
        }),
    ))
}

/// List the caller's events overlapping the requested window.
async fn list_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>> {
    let window = events::parse_window(query.from.as_deref(), query.to.as_deref())?;
    let found = events::list_events(state.db.as_ref(), &user.user_id, window).await?;

    tracing::debug!(user_id = %user.user_id, count = found.len(), "Listed events");

    Ok(Json(EventsResponse {
        events: found.into_iter().map(EventResponse::from).collect(),
    }))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
) -> Result<Json<EventResponse>> {
    let event = events::fetch_event(state.db.as_ref(), &user.user_id, &event_id).await?;
    Ok(Json(event.into()))
}

/// Apply a partial update. Answers 204 when nothing actually changed.
async fn edit_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Response> {
    let payload = json_object(body)?;
    let outcome = events::edit_event(
        state.db.as_ref(),
        &user.user_id,
        &event_id,
        &payload,
        Utc::now(),
    )
    .await?;

    Ok(match outcome {
        EditOutcome::Updated(event) => Json(EventResponse::from(event)).into_response(),
        EditOutcome::Unchanged => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
) -> Result<StatusCode> {
    events::delete_event(state.db.as_ref(), &user.user_id, &event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
