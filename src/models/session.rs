// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Walk session model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::location::{encode_route, LocationPoint};

/// A recorded walk session, from start to stop.
///
/// Built by the on-device tracker while active; immutable once
/// submitted. Route points are ordered by non-decreasing timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkSession {
    /// Session ID (also used as document ID)
    pub id: Uuid,
    /// Owning user ID
    pub user_id: u64,
    /// Dog that came along, if recorded
    pub dog_id: Option<u64>,
    /// Scheduled walk this session fulfills, if any
    pub scheduled_walk_id: Option<Uuid>,
    /// Walk start time
    pub start_time: DateTime<Utc>,
    /// Walk end time (set on stop)
    pub end_time: Option<DateTime<Utc>>,
    /// Duration excluding paused intervals
    pub duration_minutes: u32,
    /// Accumulated distance in kilometers
    pub distance_km: f64,
    /// Estimated step count
    pub steps: u32,
    /// Estimated calories burned
    pub calories_burned: u32,
    /// Accepted GPS fixes along the route
    pub route_points: Vec<LocationPoint>,
    /// First accepted fix
    pub start_location: Option<LocationPoint>,
    /// Last accepted fix
    pub end_location: Option<LocationPoint>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Whether the session ran to completion
    pub is_completed: bool,
}

impl WalkSession {
    /// Compact polyline encoding of the route (precision 5).
    pub fn encoded_polyline(&self) -> Option<String> {
        encode_route(&self.route_points)
    }

    /// Check the stored-record invariants: non-negative accumulators and
    /// route points in non-decreasing timestamp order.
    pub fn is_well_formed(&self) -> bool {
        if self.distance_km < 0.0 {
            return false;
        }
        self.route_points
            .windows(2)
            .all(|w| w[0].timestamp_ms <= w[1].timestamp_ms)
    }
}
