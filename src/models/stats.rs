//! Per-user statistics aggregates and windowed walk reports.
//!
//! The aggregate row is pre-computed when sessions are submitted,
//! reducing dashboard reads from O(sessions) to O(1). Windowed reports
//! are folded on demand from the sessions in the requested range.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::models::WalkSession;

/// Metrics extracted from a submitted walk session.
#[derive(Debug, Clone, Copy)]
pub struct WalkMetrics {
    pub distance_km: f64,
    pub duration_minutes: u32,
    pub steps: u32,
    pub calories_burned: u32,
}

impl WalkMetrics {
    pub fn from_session(session: &WalkSession) -> Self {
        Self {
            distance_km: session.distance_km,
            duration_minutes: session.duration_minutes,
            steps: session.steps,
            calories_burned: session.calories_burned,
        }
    }
}

/// Pre-computed statistics for a user.
///
/// Stored in the `user_stats` collection, keyed by user ID.
///
/// Updated via Firestore transactions so concurrent submissions for the
/// same user cannot lose increments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatistics {
    /// Owning user ID
    #[serde(default)]
    pub user_id: u64,

    // ─── Cumulative Totals ───────────────────────────────────────
    #[serde(default)]
    pub total_walks: u32,
    #[serde(default)]
    pub total_distance_km: f64,
    #[serde(default)]
    pub total_duration_minutes: u64,
    #[serde(default)]
    pub total_steps: u64,
    #[serde(default)]
    pub total_calories_burned: u64,

    // ─── Streaks ─────────────────────────────────────────────────
    /// Consecutive calendar days with at least one walk, ending at
    /// `last_walk_date`
    #[serde(default)]
    pub current_streak_days: u32,
    /// Best streak ever recorded; never decreases
    #[serde(default)]
    pub longest_streak_days: u32,
    /// Calendar date of the most recent walk
    #[serde(default)]
    pub last_walk_date: Option<NaiveDate>,

    // ─── Idempotency ─────────────────────────────────────────────
    /// Session IDs already folded into the totals (duplicate detection)
    #[serde(default)]
    pub processed_session_ids: HashSet<String>,

    // ─── Metadata ────────────────────────────────────────────────
    /// Last update timestamp (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
}

impl Default for UserStatistics {
    fn default() -> Self {
        Self {
            user_id: 0,
            total_walks: 0,
            total_distance_km: 0.0,
            total_duration_minutes: 0,
            total_steps: 0,
            total_calories_burned: 0,
            current_streak_days: 0,
            longest_streak_days: 0,
            last_walk_date: None,
            processed_session_ids: HashSet::new(),
            updated_at: String::new(),
        }
    }
}

impl UserStatistics {
    /// Zeroed statistics for a user who has not walked yet.
    pub fn empty_for(user_id: u64) -> Self {
        Self {
            user_id,
            ..Default::default()
        }
    }

    /// Fold a submitted walk into the aggregate.
    ///
    /// Returns `true` if the session was applied (new).
    /// Returns `false` if the session was already processed (duplicate).
    pub fn apply_walk(
        &mut self,
        session_id: &str,
        metrics: &WalkMetrics,
        today: NaiveDate,
        now: &str,
    ) -> bool {
        // Idempotency check: skip if already folded in
        if self.processed_session_ids.contains(session_id) {
            return false;
        }

        self.processed_session_ids.insert(session_id.to_string());
        self.updated_at = now.to_string();

        let streak = next_streak(self.last_walk_date, today, self.current_streak_days);
        self.current_streak_days = streak;
        self.longest_streak_days = self.longest_streak_days.max(streak);
        self.last_walk_date = Some(today);

        self.total_walks += 1;
        self.total_distance_km += metrics.distance_km;
        self.total_duration_minutes += u64::from(metrics.duration_minutes);
        self.total_steps += u64::from(metrics.steps);
        self.total_calories_burned += u64::from(metrics.calories_burned);

        true
    }
}

/// Compute the streak after a walk on `today`.
///
/// - first walk ever: 1
/// - another walk the same day: unchanged
/// - walk on the next calendar day: streak + 1
/// - gap of more than one day: back to 1
pub fn next_streak(last_walk: Option<NaiveDate>, today: NaiveDate, current: u32) -> u32 {
    match last_walk {
        None => 1,
        Some(last) => match (today - last).num_days() {
            0 => current,
            1 => current + 1,
            _ => 1,
        },
    }
}

// ─── Windowed Reports ────────────────────────────────────────────

/// Per-day accumulation inside a stats report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub walks: u32,
    pub distance_km: f64,
    pub duration_minutes: u64,
    pub steps: u64,
}

/// Aggregate report over a date window, with a daily breakdown for
/// charting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub total_walks: u32,
    /// Rounded to 2 decimals
    pub total_distance_km: f64,
    pub total_duration_minutes: u64,
    pub total_steps: u64,
    pub total_calories: u64,
    pub avg_distance_km: f64,
    pub avg_duration_minutes: f64,
    /// Total distance over total moving time
    pub avg_speed_kmh: f64,
    /// Keyed by calendar date ("YYYY-MM-DD") of each session's start
    pub daily: BTreeMap<String, DailyBucket>,
}

impl StatsReport {
    /// Report with zero totals and no breakdown (empty window).
    pub fn empty() -> Self {
        Self {
            total_walks: 0,
            total_distance_km: 0.0,
            total_duration_minutes: 0,
            total_steps: 0,
            total_calories: 0,
            avg_distance_km: 0.0,
            avg_duration_minutes: 0.0,
            avg_speed_kmh: 0.0,
            daily: BTreeMap::new(),
        }
    }

    /// Fold sessions into a report. Sessions are grouped into daily
    /// buckets by the calendar date of their start time.
    pub fn from_sessions(sessions: &[WalkSession]) -> Self {
        if sessions.is_empty() {
            return Self::empty();
        }

        let mut report = Self::empty();

        for session in sessions {
            report.total_walks += 1;
            report.total_distance_km += session.distance_km;
            report.total_duration_minutes += u64::from(session.duration_minutes);
            report.total_steps += u64::from(session.steps);
            report.total_calories += u64::from(session.calories_burned);

            let day = session.start_time.date_naive().to_string();
            let bucket = report.daily.entry(day).or_default();
            bucket.walks += 1;
            bucket.distance_km += session.distance_km;
            bucket.duration_minutes += u64::from(session.duration_minutes);
            bucket.steps += u64::from(session.steps);
        }

        let walks = f64::from(report.total_walks);
        report.avg_distance_km = report.total_distance_km / walks;
        report.avg_duration_minutes = report.total_duration_minutes as f64 / walks;

        let hours = report.total_duration_minutes as f64 / 60.0;
        report.avg_speed_kmh = if hours > 0.0 {
            report.total_distance_km / hours
        } else {
            0.0
        };

        report.total_distance_km = round_2dp(report.total_distance_km);
        report
    }
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
