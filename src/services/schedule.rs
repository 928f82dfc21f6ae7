// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Walk scheduling engine.
//!
//! Manages future walk appointments: creation, capacity-bounded
//! joining, leaving, status transitions, and reminder flags. Every
//! successful mutation publishes a `ScheduleEvent` to the broadcaster.

use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::{FirestoreDb, JoinResult};
use crate::error::{AppError, Result};
use crate::models::{
    ScheduleEvent, ScheduleEventType, ScheduleStatus, WalkParticipant, WalkSchedule,
};
use crate::services::ScheduleBroadcaster;

/// Walks default to a one-on-one pairing unless the organizer says
/// otherwise.
const DEFAULT_MAX_PARTICIPANTS: u32 = 2;

/// Fields for creating a schedule. Range validation happens at the
/// request boundary; these are trusted values.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub title: String,
    pub partner_id: Option<u64>,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub duration_minutes: Option<u32>,
    pub location_name: String,
    pub max_participants: Option<u32>,
    pub is_group_walk: Option<bool>,
}

/// Partial update to a schedule. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ScheduleChanges {
    pub title: Option<String>,
    pub partner_id: Option<u64>,
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<NaiveTime>,
    pub duration_minutes: Option<u32>,
    pub location_name: Option<String>,
    pub max_participants: Option<u32>,
    pub status: Option<ScheduleStatus>,
}

/// Filters for listing a user's schedules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleFilters {
    pub status: Option<ScheduleStatus>,
    pub upcoming_only: bool,
}

/// Scheduling engine: owns the persistence calls and the per-walk join
/// serialization.
#[derive(Clone)]
pub struct ScheduleEngine {
    db: FirestoreDb,
    broadcaster: Arc<ScheduleBroadcaster>,
    /// Per-walk locks so concurrent joins from this instance serialize
    /// before they reach the transactional capacity check
    join_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ScheduleEngine {
    pub fn new(db: FirestoreDb, broadcaster: Arc<ScheduleBroadcaster>) -> Self {
        Self {
            db,
            broadcaster,
            join_locks: Arc::new(DashMap::new()),
        }
    }

    /// Create a schedule. The scheduled date is not checked against the
    /// clock; the client form enforces that.
    pub async fn create(&self, organizer_id: u64, new: NewSchedule) -> Result<WalkSchedule> {
        let schedule = WalkSchedule {
            id: Uuid::new_v4(),
            organizer_id,
            partner_id: new.partner_id,
            title: new.title,
            scheduled_date: new.scheduled_date,
            scheduled_time: new.scheduled_time,
            duration_minutes: new.duration_minutes,
            location_name: new.location_name,
            max_participants: new.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS),
            is_group_walk: new.is_group_walk.unwrap_or(false),
            status: ScheduleStatus::Scheduled,
            reminder_sent: false,
            joined_count: 0,
            created_at: Utc::now(),
        };

        self.db.set_schedule(&schedule).await?;

        tracing::info!(
            schedule_id = %schedule.id,
            organizer_id,
            date = %schedule.scheduled_date,
            "Walk schedule created"
        );

        self.publish(ScheduleEventType::ScheduleCreated, &schedule, organizer_id);
        Ok(schedule)
    }

    /// Update a schedule. Only the organizer or the assigned partner
    /// may mutate it; completed and cancelled schedules are terminal.
    pub async fn update(
        &self,
        schedule_id: Uuid,
        acting_user_id: u64,
        changes: ScheduleChanges,
    ) -> Result<WalkSchedule> {
        let mut schedule = self
            .db
            .get_schedule(schedule_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Schedule {} not found", schedule_id)))?;

        if !schedule.editable_by(acting_user_id) {
            return Err(AppError::Forbidden(
                "only the organizer or partner may modify this walk".to_string(),
            ));
        }

        if schedule.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "schedule is {}",
                schedule.status.as_str()
            )));
        }

        if let Some(title) = changes.title {
            schedule.title = title;
        }
        if let Some(partner_id) = changes.partner_id {
            schedule.partner_id = Some(partner_id);
        }
        if let Some(date) = changes.scheduled_date {
            schedule.scheduled_date = date;
        }
        if let Some(time) = changes.scheduled_time {
            schedule.scheduled_time = time;
        }
        if let Some(duration) = changes.duration_minutes {
            schedule.duration_minutes = Some(duration);
        }
        if let Some(location) = changes.location_name {
            schedule.location_name = location;
        }
        if let Some(max) = changes.max_participants {
            schedule.max_participants = max;
        }

        let event_type = match changes.status {
            Some(status) => {
                schedule.status = status;
                ScheduleEventType::for_status(status)
            }
            None => ScheduleEventType::ScheduleUpdated,
        };

        self.db.set_schedule(&schedule).await?;

        tracing::info!(
            schedule_id = %schedule.id,
            acting_user_id,
            event = %event_type,
            "Walk schedule updated"
        );

        self.publish(event_type, &schedule, acting_user_id);
        Ok(schedule)
    }

    /// Join a walk. Joins for one walk are serialized through a
    /// per-walk lock, and the capacity check itself runs inside a
    /// Firestore transaction, so the walk can never over-fill.
    pub async fn join(
        &self,
        walk_id: Uuid,
        user_id: u64,
        dog_id: Option<u64>,
    ) -> Result<JoinResult> {
        let lock = self
            .join_locks
            .entry(walk_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let result = self
            .db
            .join_walk_atomic(walk_id, user_id, dog_id, Utc::now())
            .await?;

        if result.newly_joined {
            self.publish(ScheduleEventType::ScheduleUpdated, &result.schedule, user_id);
        }

        Ok(result)
    }

    /// Leave a walk. Requires an existing participant row.
    pub async fn leave(&self, walk_id: Uuid, user_id: u64) -> Result<WalkParticipant> {
        let (schedule, participant) = self
            .db
            .leave_walk_atomic(walk_id, user_id, Utc::now())
            .await?;

        self.publish(ScheduleEventType::ScheduleUpdated, &schedule, user_id);
        Ok(participant)
    }

    /// All participant rows for a walk.
    pub async fn participants(&self, walk_id: Uuid) -> Result<Vec<WalkParticipant>> {
        self.db.get_participants(walk_id).await
    }

    /// Schedules where the user is organizer or partner, optionally
    /// filtered, sorted by date and time.
    pub async fn list_for_user(
        &self,
        user_id: u64,
        filters: ScheduleFilters,
    ) -> Result<Vec<WalkSchedule>> {
        let mut schedules = self.db.get_schedules_for_user(user_id).await?;

        if let Some(status) = filters.status {
            schedules.retain(|s| s.status == status);
        }

        if filters.upcoming_only {
            let now = Utc::now();
            let today = now.date_naive();
            let now_time = now.time();
            schedules.retain(|s| s.is_upcoming(today, now_time));
        }

        schedules.sort_by(|a, b| {
            (a.scheduled_date, a.scheduled_time).cmp(&(b.scheduled_date, b.scheduled_time))
        });

        Ok(schedules)
    }

    /// Scheduled walks within `within_days` of today whose reminder has
    /// not been sent yet.
    pub async fn pending_reminders(&self, within_days: u64) -> Result<Vec<WalkSchedule>> {
        let due_date = Utc::now()
            .date_naive()
            .checked_add_days(Days::new(within_days))
            .unwrap_or_else(|| Utc::now().date_naive());

        self.db.get_schedules_due_for_reminder(due_date).await
    }

    /// Flag a schedule's reminder as sent.
    pub async fn mark_reminder_sent(&self, schedule_id: Uuid) -> Result<()> {
        let mut schedule = self
            .db
            .get_schedule(schedule_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Schedule {} not found", schedule_id)))?;

        if schedule.reminder_sent {
            return Ok(());
        }

        schedule.reminder_sent = true;
        self.db.set_schedule(&schedule).await
    }

    fn publish(&self, event_type: ScheduleEventType, schedule: &WalkSchedule, acting_user_id: u64) {
        self.broadcaster.publish(&ScheduleEvent {
            event_type,
            schedule: schedule.clone(),
            acting_user_id,
            occurred_at: Utc::now(),
        });
    }
}
