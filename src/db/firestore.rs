// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Walk sessions (recorded walks + windowed/paginated queries)
//! - User statistics (transactional aggregate updates)
//! - Walk schedules and participants (capacity-safe join/leave)
//!
//! Read-modify-write sequences run inside Firestore transactions so
//! that concurrent submissions or joins conflict and retry instead of
//! silently overwriting each other.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    ParticipantStatus, ScheduleStatus, UserStatistics, WalkMetrics, WalkParticipant, WalkSchedule,
    WalkSession,
};
use crate::time_utils::format_utc_rfc3339;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Cursor for forward pagination through a user's walk history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionQueryCursor {
    pub start_time: DateTime<Utc>,
    pub session_id: Uuid,
}

/// Outcome of a join operation.
#[derive(Debug, Clone)]
pub struct JoinResult {
    pub schedule: WalkSchedule,
    pub participant: WalkParticipant,
    /// False when the user was already joined (idempotent repeat)
    pub newly_joined: bool,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Walk Session Operations ─────────────────────────────────

    /// Get a walk session by ID.
    pub async fn get_session(&self, session_id: Uuid) -> Result<Option<WalkSession>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::WALK_SESSIONS)
            .obj()
            .one(&session_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a walk session (upsert; re-submission overwrites the same
    /// document).
    pub async fn set_session(&self, session: &WalkSession) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::WALK_SESSIONS)
            .document_id(session.id.to_string())
            .object(session)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a user's completed sessions whose start time falls in
    /// `[window_start, window_end)`.
    pub async fn get_sessions_in_window(
        &self,
        user_id: u64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<WalkSession>, AppError> {
        let start = format_utc_rfc3339(window_start);
        let end = format_utc_rfc3339(window_end);

        self.get_client()?
            .fluent()
            .select()
            .from(collections::WALK_SESSIONS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("start_time").greater_than_or_equal(start.clone()),
                    q.field("start_time").less_than(end.clone()),
                ])
            })
            .order_by([(
                "start_time",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get sessions for a user with cursor pagination, newest first.
    pub async fn get_sessions_for_user(
        &self,
        user_id: u64,
        cursor: Option<SessionQueryCursor>,
        limit: u32,
    ) -> Result<Vec<WalkSession>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WALK_SESSIONS);

        let query = if let Some(cursor) = cursor {
            let before = format_utc_rfc3339(cursor.start_time);
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("start_time").less_than(before.clone()),
                ])
            })
        } else {
            query.filter(move |q| q.field("user_id").eq(user_id))
        };

        query
            .order_by([(
                "start_time",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── User Stats Operations ──────────────────────────────────

    /// Get the user stats aggregate document.
    pub async fn get_user_stats(&self, user_id: u64) -> Result<Option<UserStatistics>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_STATS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store the user stats aggregate document.
    pub async fn set_user_stats(
        &self,
        user_id: u64,
        stats: &UserStatistics,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_STATS)
            .document_id(user_id.to_string())
            .object(stats)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fold a submitted walk into the user's aggregate statistics.
    ///
    /// Runs inside a Firestore transaction: the stats document is read,
    /// updated in memory, and written back; a concurrent submission for
    /// the same user conflicts on the document and the transaction is
    /// retried with fresh data, so no increment is lost.
    ///
    /// Returns `true` if the walk was newly applied, `false` if this
    /// session ID was already processed (idempotent duplicate).
    pub async fn apply_walk_stats(
        &self,
        user_id: u64,
        session_id: Uuid,
        metrics: &WalkMetrics,
        today: NaiveDate,
    ) -> Result<bool, AppError> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Read current stats; this registers the document for conflict
        // detection.
        let current: Option<UserStatistics> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_STATS)
            .obj()
            .one(&user_id.to_string())
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read stats in transaction: {}", e))
            })?;

        let mut stats = current.unwrap_or_else(|| UserStatistics::empty_for(user_id));
        stats.user_id = user_id;

        let applied = stats.apply_walk(&session_id.to_string(), metrics, today, &now);
        if !applied {
            tracing::debug!(
                user_id,
                session_id = %session_id,
                "Session already folded into stats (idempotent skip)"
            );
            let _ = transaction.rollback().await;
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_STATS)
            .document_id(user_id.to_string())
            .object(&stats)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add stats to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id,
            session_id = %session_id,
            streak = stats.current_streak_days,
            "User statistics updated"
        );

        Ok(true)
    }

    // ─── Walk Schedule Operations ───────────────────────────────

    /// Get a schedule by ID.
    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<Option<WalkSchedule>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::WALK_SCHEDULES)
            .obj()
            .one(&schedule_id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a schedule.
    pub async fn set_schedule(&self, schedule: &WalkSchedule) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::WALK_SCHEDULES)
            .document_id(schedule.id.to_string())
            .object(schedule)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all schedules where the user is organizer or partner.
    pub async fn get_schedules_for_user(
        &self,
        user_id: u64,
    ) -> Result<Vec<WalkSchedule>, AppError> {
        let as_organizer: Vec<WalkSchedule> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WALK_SCHEDULES)
            .filter(move |q| q.field("organizer_id").eq(user_id))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let as_partner: Vec<WalkSchedule> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::WALK_SCHEDULES)
            .filter(move |q| q.field("partner_id").eq(user_id))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Merge the two queries; a user organizing a walk with
        // themselves as partner would otherwise appear twice.
        let mut schedules = as_organizer;
        for schedule in as_partner {
            if !schedules.iter().any(|s| s.id == schedule.id) {
                schedules.push(schedule);
            }
        }

        Ok(schedules)
    }

    /// Scheduled walks on or before `due_date` that have not had their
    /// reminder sent.
    pub async fn get_schedules_due_for_reminder(
        &self,
        due_date: NaiveDate,
    ) -> Result<Vec<WalkSchedule>, AppError> {
        let due = due_date.to_string();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::WALK_SCHEDULES)
            .filter(move |q| {
                q.for_all([
                    q.field("status").eq("scheduled"),
                    q.field("reminder_sent").eq(false),
                    q.field("scheduled_date").less_than_or_equal(due.clone()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Participant Operations ─────────────────────────────────

    /// Get the participant row for a (walk, user) pair.
    pub async fn get_participant(
        &self,
        walk_id: Uuid,
        user_id: u64,
    ) -> Result<Option<WalkParticipant>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::WALK_PARTICIPANTS)
            .obj()
            .one(&WalkParticipant::doc_id(walk_id, user_id))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All participant rows for a walk, joined and left.
    pub async fn get_participants(&self, walk_id: Uuid) -> Result<Vec<WalkParticipant>, AppError> {
        let walk = walk_id.to_string();

        self.get_client()?
            .fluent()
            .select()
            .from(collections::WALK_PARTICIPANTS)
            .filter(move |q| q.field("walk_id").eq(walk.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Join a walk, enforcing capacity atomically.
    ///
    /// The capacity check, the participant write, and the
    /// `joined_count` bump on the schedule all happen in one Firestore
    /// transaction. Two concurrent joins near capacity conflict on the
    /// schedule document, so one of them retries against the updated
    /// count and fails with `Full` instead of over-filling the walk.
    pub async fn join_walk_atomic(
        &self,
        walk_id: Uuid,
        user_id: u64,
        dog_id: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<JoinResult, AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut schedule = match self.get_schedule(walk_id).await? {
            Some(schedule) => schedule,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!("Walk {} not found", walk_id)));
            }
        };

        if schedule.status != ScheduleStatus::Scheduled {
            let _ = transaction.rollback().await;
            return Err(AppError::InvalidState(
                "walk is no longer open for joining".to_string(),
            ));
        }

        let existing = self.get_participant(walk_id, user_id).await?;

        // Already joined: idempotent repeat, no capacity change.
        if let Some(participant) = existing
            .as_ref()
            .filter(|p| p.status == ParticipantStatus::Joined)
        {
            let _ = transaction.rollback().await;
            return Ok(JoinResult {
                schedule,
                participant: participant.clone(),
                newly_joined: false,
            });
        }

        if !schedule.has_capacity() {
            let _ = transaction.rollback().await;
            return Err(AppError::Full);
        }

        // Re-activate a previously-left row instead of inserting a
        // duplicate.
        let participant = match existing {
            Some(mut row) => {
                row.status = ParticipantStatus::Joined;
                row.dog_id = dog_id;
                row.joined_at = now;
                row.left_at = None;
                row
            }
            None => WalkParticipant {
                walk_id,
                user_id,
                dog_id,
                status: ParticipantStatus::Joined,
                joined_at: now,
                left_at: None,
            },
        };

        schedule.joined_count += 1;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::WALK_PARTICIPANTS)
            .document_id(WalkParticipant::doc_id(walk_id, user_id))
            .object(&participant)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add participant to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::WALK_SCHEDULES)
            .document_id(schedule.id.to_string())
            .object(&schedule)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add schedule to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            walk_id = %walk_id,
            user_id,
            joined = schedule.joined_count,
            capacity = schedule.max_participants,
            "Participant joined walk"
        );

        Ok(JoinResult {
            schedule,
            participant,
            newly_joined: true,
        })
    }

    /// Leave a walk: mark the participant row left and release the
    /// capacity slot, atomically.
    pub async fn leave_walk_atomic(
        &self,
        walk_id: Uuid,
        user_id: u64,
        now: DateTime<Utc>,
    ) -> Result<(WalkSchedule, WalkParticipant), AppError> {
        let mut transaction = self
            .get_client()?
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut schedule = match self.get_schedule(walk_id).await? {
            Some(schedule) => schedule,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotFound(format!("Walk {} not found", walk_id)));
            }
        };

        let mut participant = match self.get_participant(walk_id, user_id).await? {
            Some(row) => row,
            None => {
                let _ = transaction.rollback().await;
                return Err(AppError::NotParticipant);
            }
        };

        // Leaving twice is a no-op.
        if participant.status == ParticipantStatus::Left {
            let _ = transaction.rollback().await;
            return Ok((schedule, participant));
        }

        participant.status = ParticipantStatus::Left;
        participant.left_at = Some(now);
        schedule.joined_count = schedule.joined_count.saturating_sub(1);

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::WALK_PARTICIPANTS)
            .document_id(WalkParticipant::doc_id(walk_id, user_id))
            .object(&participant)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add participant to transaction: {}", e))
            })?;

        self.get_client()?
            .fluent()
            .update()
            .in_col(collections::WALK_SCHEDULES)
            .document_id(schedule.id.to_string())
            .object(&schedule)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add schedule to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(walk_id = %walk_id, user_id, "Participant left walk");

        Ok((schedule, participant))
    }
}
