// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Windowed statistics queries.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Deserialize;

use crate::db::FirestoreDb;
use crate::error::{AppError, Result};
use crate::models::{StatsReport, UserStatistics};

/// Aggregation period for walk stats queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Day,
    Week,
    Month,
    Year,
}

impl StatsPeriod {
    /// Days covered by a rolling window ending today.
    fn window_days(self) -> u64 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
            Self::Year => 365,
        }
    }
}

/// Resolve the inclusive date window for a query. Explicit dates
/// override the period-derived window.
pub fn resolve_window(
    period: StatsPeriod,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    match (start_date, end_date) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, today),
        (None, explicit_end) => {
            let end = explicit_end.unwrap_or(today);
            let start = end
                .checked_sub_days(Days::new(period.window_days() - 1))
                .unwrap_or(end);
            (start, end)
        }
    }
}

/// Read side of the statistics subsystem.
#[derive(Clone)]
pub struct StatsService {
    db: FirestoreDb,
}

impl StatsService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Cumulative statistics for a user.
    ///
    /// Fails open: a first-time user gets a zeroed record, never a 404.
    pub async fn get_user_stats(&self, user_id: u64) -> Result<UserStatistics> {
        let stats = self
            .db
            .get_user_stats(user_id)
            .await?
            .unwrap_or_else(|| UserStatistics::empty_for(user_id));
        Ok(stats)
    }

    /// Windowed aggregate report with a daily breakdown for charting.
    ///
    /// An empty window produces zero totals and an empty breakdown,
    /// never an error.
    pub async fn get_walk_stats(
        &self,
        user_id: u64,
        period: StatsPeriod,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<StatsReport> {
        let today = Utc::now().date_naive();
        let (start, end) = resolve_window(period, start_date, end_date, today);

        if start > end {
            return Err(AppError::BadRequest(
                "start_date must not be after end_date".to_string(),
            ));
        }

        let window_start = day_floor(start);
        // Half-open upper bound: the first instant of the day after `end`
        let window_end = day_floor(end.checked_add_days(Days::new(1)).unwrap_or(end));

        let sessions = self
            .db
            .get_sessions_in_window(user_id, window_start, window_end)
            .await?;

        tracing::debug!(
            user_id,
            sessions = sessions.len(),
            start = %start,
            end = %end,
            "Computed walk stats window"
        );

        Ok(StatsReport::from_sessions(&sessions))
    }
}

fn day_floor(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH)
}
