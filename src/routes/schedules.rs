// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Walk schedule routes: CRUD, join/leave, and the live update stream.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ScheduleStatus, WalkParticipant, WalkSchedule};
use crate::services::{NewSchedule, ScheduleChanges, ScheduleFilters};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{NaiveDate, NaiveTime};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Schedule routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/schedules", post(create_schedule).get(get_schedules))
        .route("/api/schedules/updates", get(subscribe_updates))
        .route("/api/schedules/{id}", patch(update_schedule))
        .route("/api/schedules/{id}/join", post(join_walk))
        .route("/api/schedules/{id}/leave", post(leave_walk))
}

// ─── Create / Update ─────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct CreateScheduleRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: String,
    pub partner_id: Option<u64>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    /// Planned duration; group walk forms offer 15 minutes to 5 hours
    #[validate(range(min = 15, max = 300))]
    pub duration_minutes: Option<u32>,
    #[validate(length(min = 1, max = 160))]
    pub location_name: String,
    #[validate(range(min = 2, max = 50))]
    pub max_participants: Option<u32>,
    pub is_group_walk: Option<bool>,
}

/// Create a walk schedule with the current user as organizer.
async fn create_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateScheduleRequest>,
) -> Result<Json<WalkSchedule>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let schedule = state
        .schedules
        .create(
            user.user_id,
            NewSchedule {
                title: payload.title,
                partner_id: payload.partner_id,
                scheduled_date: payload.scheduled_date,
                scheduled_time: payload.scheduled_time,
                duration_minutes: payload.duration_minutes,
                location_name: payload.location_name,
                max_participants: payload.max_participants,
                is_group_walk: payload.is_group_walk,
            },
        )
        .await?;

    Ok(Json(schedule))
}

#[derive(Deserialize, Validate)]
pub struct UpdateScheduleRequest {
    #[validate(length(min = 1, max = 120))]
    pub title: Option<String>,
    pub partner_id: Option<u64>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    #[validate(range(min = 15, max = 300))]
    pub duration_minutes: Option<u32>,
    #[validate(length(min = 1, max = 160))]
    pub location_name: Option<String>,
    #[validate(range(min = 2, max = 50))]
    pub max_participants: Option<u32>,
    /// Moving to completed or cancelled is terminal
    pub status: Option<ScheduleStatus>,
}

/// Update a schedule. Only the organizer or assigned partner may.
async fn update_schedule(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateScheduleRequest>,
) -> Result<Json<WalkSchedule>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let schedule = state
        .schedules
        .update(
            id,
            user.user_id,
            ScheduleChanges {
                title: payload.title,
                partner_id: payload.partner_id,
                scheduled_date: payload.scheduled_date,
                scheduled_time: payload.scheduled_time,
                duration_minutes: payload.duration_minutes,
                location_name: payload.location_name,
                max_participants: payload.max_participants,
                status: payload.status,
            },
        )
        .await?;

    Ok(Json(schedule))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct SchedulesQuery {
    status: Option<ScheduleStatus>,
    /// Only walks strictly ahead of now
    #[serde(default)]
    upcoming: bool,
}

/// List schedules where the current user is organizer or partner.
async fn get_schedules(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<SchedulesQuery>,
) -> Result<Json<Vec<WalkSchedule>>> {
    let schedules = state
        .schedules
        .list_for_user(
            user.user_id,
            ScheduleFilters {
                status: params.status,
                upcoming_only: params.upcoming,
            },
        )
        .await?;

    Ok(Json(schedules))
}

// ─── Join / Leave ────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct JoinWalkQuery {
    pub dog_id: Option<u64>,
}

/// Join a scheduled walk, bringing a dog along if given.
async fn join_walk(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Query(params): Query<JoinWalkQuery>,
) -> Result<Json<WalkParticipant>> {
    let result = state.schedules.join(id, user.user_id, params.dog_id).await?;
    Ok(Json(result.participant))
}

/// Leave a walk the user previously joined.
async fn leave_walk(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<WalkParticipant>> {
    let participant = state.schedules.leave(id, user.user_id).await?;
    Ok(Json(participant))
}

// ─── Live Updates ────────────────────────────────────────────

/// Subscribe to schedule updates for the current user (SSE).
///
/// Delivery is best-effort: a client that disconnects misses events
/// and should refetch `/api/schedules` on reconnect (polling that
/// endpoint is the degraded-mode fallback when streaming transports
/// are unavailable).
async fn subscribe_updates(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::debug!(user_id = user.user_id, "Schedule update stream opened");

    let subscription = state.broadcaster.subscribe(user.user_id);

    let stream = subscription.map(|event| {
        let name = event.event_type.as_str();
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event(name).data(data))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
