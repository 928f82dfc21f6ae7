// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Statistics routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::StatsReport;
use crate::services::StatsPeriod;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stats routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stats", get(get_user_stats))
        .route("/api/stats/walks", get(get_walk_stats))
}

// ─── Cumulative Stats ────────────────────────────────────────

/// Cumulative user statistics response. The stored idempotency
/// bookkeeping stays internal.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStatsResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub user_id: u64,
    pub total_walks: u32,
    pub total_distance_km: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_duration_minutes: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_steps: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_calories_burned: u64,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    /// Calendar date, "YYYY-MM-DD"
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub last_walk_date: Option<NaiveDate>,
}

/// Get cumulative statistics for the current user.
///
/// First-time users get a zeroed record, never a 404.
async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserStatsResponse>> {
    let stats = state.stats.get_user_stats(user.user_id).await?;

    Ok(Json(UserStatsResponse {
        user_id: user.user_id,
        total_walks: stats.total_walks,
        total_distance_km: stats.total_distance_km,
        total_duration_minutes: stats.total_duration_minutes,
        total_steps: stats.total_steps,
        total_calories_burned: stats.total_calories_burned,
        current_streak_days: stats.current_streak_days,
        longest_streak_days: stats.longest_streak_days,
        last_walk_date: stats.last_walk_date,
    }))
}

// ─── Windowed Stats ──────────────────────────────────────────

#[derive(Deserialize)]
struct WalkStatsQuery {
    /// Aggregation period; explicit dates override it
    period: Option<StatsPeriod>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

/// Get windowed walk stats with a daily breakdown for charts.
async fn get_walk_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<WalkStatsQuery>,
) -> Result<Json<StatsReport>> {
    let period = params.period.unwrap_or(StatsPeriod::Week);

    let report = state
        .stats
        .get_walk_stats(user.user_id, period, params.start_date, params.end_date)
        .await?;

    Ok(Json(report))
}
