// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Walk session submission and history routes.

use crate::db::SessionQueryCursor;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{WalkMetrics, WalkSession};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::post,
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Walk routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/walks", post(submit_walk).get(get_walks))
}

// ─── Submission ──────────────────────────────────────────────

/// Response for a submitted walk session.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SubmitWalkResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub id: uuid::Uuid,
    /// False when the session was stored but the statistics update
    /// failed; stats are repaired out-of-band in that case.
    pub stats_updated: bool,
}

/// Persist a completed walk session and fold it into the user's
/// statistics.
///
/// The session write is authoritative. The statistics update is
/// best-effort: a failure there is logged and reported via
/// `stats_updated`, but never rolls back the session.
async fn submit_walk(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(session): Json<WalkSession>,
) -> Result<Json<SubmitWalkResponse>> {
    if session.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "session belongs to another user".to_string(),
        ));
    }

    if !session.is_completed {
        return Err(AppError::BadRequest(
            "only completed sessions can be submitted".to_string(),
        ));
    }

    if !session.is_well_formed() {
        return Err(AppError::BadRequest(
            "session has negative totals or unordered route points".to_string(),
        ));
    }

    state.db.set_session(&session).await?;

    let metrics = WalkMetrics::from_session(&session);
    let today = chrono::Utc::now().date_naive();

    let stats_updated = match state
        .db
        .apply_walk_stats(user.user_id, session.id, &metrics, today)
        .await
    {
        Ok(applied) => applied,
        Err(e) => {
            // The session itself is durable; statistics can be repaired
            // out-of-band.
            tracing::warn!(
                user_id = user.user_id,
                session_id = %session.id,
                error = %e,
                "Statistics update failed after session write"
            );
            false
        }
    };

    Ok(Json(SubmitWalkResponse {
        id: session.id,
        stats_updated,
    }))
}

// ─── History ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct WalksQuery {
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    50
}

const MAX_PER_PAGE: u32 = 100;
const CURSOR_PARTS: usize = 3;

fn parse_cursor(cursor: Option<&str>) -> Result<Option<SessionQueryCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor =
                || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let parts: Vec<&str> = decoded_str.split(':').collect();
            if parts.len() != CURSOR_PARTS {
                return Err(invalid_cursor());
            }

            let seconds = parts[0].parse::<i64>().map_err(|_| invalid_cursor())?;
            let nanos = parts[1].parse::<u32>().map_err(|_| invalid_cursor())?;
            let session_id = parts[2].parse::<uuid::Uuid>().map_err(|_| invalid_cursor())?;
            let start_time =
                chrono::DateTime::from_timestamp(seconds, nanos).ok_or_else(invalid_cursor)?;

            Ok(SessionQueryCursor {
                start_time,
                session_id,
            })
        })
        .transpose()
}

fn encode_cursor(cursor: SessionQueryCursor) -> String {
    let payload = format!(
        "{}:{}:{}",
        cursor.start_time.timestamp(),
        cursor.start_time.timestamp_subsec_nanos(),
        cursor.session_id
    );
    URL_SAFE_NO_PAD.encode(payload)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WalksResponse {
    pub walks: Vec<WalkSummary>,
    pub per_page: u32,
    pub next_cursor: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WalkSummary {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub id: uuid::Uuid,
    pub start_time: String,
    pub duration_minutes: u32,
    pub distance_km: f64,
    pub steps: u32,
    pub calories_burned: u32,
    /// Precision-5 polyline of the route, when there is one
    pub route_polyline: Option<String>,
}

/// Get the user's walk history, newest first, with cursor pagination.
async fn get_walks(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<WalksQuery>,
) -> Result<Json<WalksResponse>> {
    tracing::debug!(
        user_id = user.user_id,
        cursor = ?params.cursor,
        per_page = params.per_page,
        "Fetching walk history"
    );

    let limit = params.per_page.min(MAX_PER_PAGE);
    let cursor = parse_cursor(params.cursor.as_deref())?;

    // Fetch one extra item to determine if another page is available.
    let fetch_limit = limit.saturating_add(1);
    let mut sessions = state
        .db
        .get_sessions_for_user(user.user_id, cursor, fetch_limit)
        .await?;

    let has_more = sessions.len() > limit as usize;
    if has_more {
        sessions.truncate(limit as usize);
    }

    let next_cursor = if has_more {
        sessions.last().map(|s| {
            encode_cursor(SessionQueryCursor {
                start_time: s.start_time,
                session_id: s.id,
            })
        })
    } else {
        None
    };

    let walks: Vec<WalkSummary> = sessions
        .into_iter()
        .map(|s| WalkSummary {
            id: s.id,
            start_time: format_utc_rfc3339(s.start_time),
            duration_minutes: s.duration_minutes,
            distance_km: s.distance_km,
            steps: s.steps,
            calories_burned: s.calories_burned,
            route_polyline: s.encoded_polyline(),
        })
        .collect();

    Ok(Json(WalksResponse {
        walks,
        per_page: limit,
        next_cursor,
    }))
}
