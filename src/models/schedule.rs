// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Walk schedule, participant, and schedule-event models.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a scheduled walk. Completed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A planned walk with a capacity and participant list, distinct from a
/// recorded session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkSchedule {
    /// Schedule ID (also used as document ID)
    pub id: Uuid,
    /// User who created the walk
    pub organizer_id: u64,
    /// Matched walking partner, if any
    pub partner_id: Option<u64>,
    pub title: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    /// Planned duration in minutes
    pub duration_minutes: Option<u32>,
    pub location_name: String,
    pub max_participants: u32,
    pub is_group_walk: bool,
    pub status: ScheduleStatus,
    /// Whether the upcoming-walk reminder has been sent
    pub reminder_sent: bool,
    /// Count of participants with status `joined`; maintained inside
    /// the same transaction as participant writes so capacity checks
    /// cannot race
    pub joined_count: u32,
    pub created_at: DateTime<Utc>,
}

impl WalkSchedule {
    /// Whether `user_id` may mutate this schedule.
    pub fn editable_by(&self, user_id: u64) -> bool {
        self.organizer_id == user_id || self.partner_id == Some(user_id)
    }

    /// Whether another participant fits under `max_participants`.
    pub fn has_capacity(&self) -> bool {
        self.joined_count < self.max_participants
    }

    /// Whether this walk is still ahead of the given instant: a later
    /// date, or today with a start time at or after `now_time`.
    pub fn is_upcoming(&self, today: NaiveDate, now_time: NaiveTime) -> bool {
        self.scheduled_date > today
            || (self.scheduled_date == today && self.scheduled_time >= now_time)
    }
}

/// Membership of a user in a scheduled walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Joined,
    Left,
}

/// One row per (walk, user); re-joining re-activates the existing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkParticipant {
    pub walk_id: Uuid,
    pub user_id: u64,
    pub dog_id: Option<u64>,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl WalkParticipant {
    /// Document ID for the participant row.
    pub fn doc_id(walk_id: Uuid, user_id: u64) -> String {
        format!("{}_{}", walk_id, user_id)
    }
}

// ─── Schedule Events ─────────────────────────────────────────────

/// Event types published on schedule mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleEventType {
    ScheduleCreated,
    ScheduleUpdated,
    ScheduleCancelled,
    ScheduleCompleted,
}

impl ScheduleEventType {
    /// Returns the string representation of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScheduleCreated => "schedule_created",
            Self::ScheduleUpdated => "schedule_updated",
            Self::ScheduleCancelled => "schedule_cancelled",
            Self::ScheduleCompleted => "schedule_completed",
        }
    }

    /// Event type matching a status transition, if the transition is
    /// itself the event (cancel/complete); plain updates map to
    /// `ScheduleUpdated`.
    pub fn for_status(status: ScheduleStatus) -> Self {
        match status {
            ScheduleStatus::Cancelled => Self::ScheduleCancelled,
            ScheduleStatus::Completed => Self::ScheduleCompleted,
            ScheduleStatus::Scheduled => Self::ScheduleUpdated,
        }
    }
}

impl std::fmt::Display for ScheduleEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A schedule mutation, fanned out to interested subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub event_type: ScheduleEventType,
    /// Full updated schedule
    pub schedule: WalkSchedule,
    /// User whose action produced the event
    pub acting_user_id: u64,
    pub occurred_at: DateTime<Utc>,
}

impl ScheduleEvent {
    /// Users this event concerns: organizer, partner, and the actor.
    pub fn interested_user_ids(&self) -> Vec<u64> {
        let mut ids = vec![self.schedule.organizer_id];
        if let Some(partner) = self.schedule.partner_id {
            if !ids.contains(&partner) {
                ids.push(partner);
            }
        }
        if !ids.contains(&self.acting_user_id) {
            ids.push(self.acting_user_id);
        }
        ids
    }
}
