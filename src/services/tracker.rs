// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! On-device walk session builder.
//!
//! Consumes position samples from the geolocation sampler, filters GPS
//! noise, accumulates distance/steps/calories/speed, and manages the
//! idle/active/paused state machine for a single walk. Timestamps come
//! from the samples themselves, so the machine is deterministic.

use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{LocationPoint, WalkSession};
use crate::time_utils::datetime_from_millis;

/// Segments shorter than this are GPS jitter and are discarded.
const MIN_SEGMENT_METERS: f64 = 2.0;
/// Segments longer than this are implausible jumps and are discarded.
const MAX_SEGMENT_METERS: f64 = 50.0;
/// Assumed stride length for step estimation.
const STRIDE_METERS: f64 = 0.75;
/// Walking burns roughly 50 kcal per kilometer.
const KCAL_PER_KM: f64 = 50.0;
/// Average speed is not reported until this much time has elapsed;
/// GPS is still settling before that.
const SPEED_WARMUP_MS: i64 = 30_000;
const MIN_SPEED_KMH: f64 = 1.0;
const MAX_SPEED_KMH: f64 = 8.0;

/// Tracker lifecycle. A stopped tracker returns to Idle and yields its
/// completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Active,
    Paused,
}

/// Tracking failures. These are terminal for the attempted operation
/// and never corrupt accumulated state.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Location access unavailable: no last-known position")]
    PermissionDenied,

    #[error("Invalid transition: {0}")]
    InvalidTransition(&'static str),

    #[error("Unknown session: {0}")]
    UnknownSession(Uuid),
}

/// What happened to an offered sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Segment in range; accumulators updated
    Accepted,
    /// Below the jitter floor; nothing changed
    FilteredJitter,
    /// Above the jump ceiling; nothing changed
    FilteredJump,
    /// Tracker is not active; sample dropped
    NotActive,
}

/// State machine and accumulators for a single walk.
#[derive(Debug)]
pub struct WalkTracker {
    id: Uuid,
    user_id: u64,
    dog_id: Option<u64>,
    scheduled_walk_id: Option<Uuid>,
    state: TrackerState,
    started_at_ms: i64,
    paused_at_ms: Option<i64>,
    paused_total_ms: i64,
    last_accepted: LocationPoint,
    route: Vec<LocationPoint>,
    distance_m: f64,
    steps: u32,
    calories: u32,
    avg_speed_kmh: Option<f64>,
}

impl WalkTracker {
    /// Begin tracking from a last-known position.
    ///
    /// Fails with `PermissionDenied` when no fix is available, which is
    /// what an unavailable location permission looks like to the app.
    pub fn start(
        id: Uuid,
        user_id: u64,
        dog_id: Option<u64>,
        scheduled_walk_id: Option<Uuid>,
        origin: Option<LocationPoint>,
    ) -> Result<Self, TrackError> {
        let origin = origin.ok_or(TrackError::PermissionDenied)?;

        Ok(Self {
            id,
            user_id,
            dog_id,
            scheduled_walk_id,
            state: TrackerState::Active,
            started_at_ms: origin.timestamp_ms,
            paused_at_ms: None,
            paused_total_ms: 0,
            last_accepted: origin,
            route: vec![origin],
            distance_m: 0.0,
            steps: 0,
            calories: 0,
            avg_speed_kmh: None,
        })
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn calories(&self) -> u32 {
        self.calories
    }

    pub fn avg_speed_kmh(&self) -> Option<f64> {
        self.avg_speed_kmh
    }

    /// Elapsed walking time at `now_ms`, excluding paused intervals.
    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        let frozen_now = self.paused_at_ms.unwrap_or(now_ms);
        (frozen_now - self.started_at_ms - self.paused_total_ms).max(0)
    }

    /// Process one position sample. Only active trackers accept
    /// samples; the segment to the last *accepted* point must be
    /// within [2 m, 50 m] or the sample is discarded without moving
    /// the anchor.
    pub fn record_sample(&mut self, point: LocationPoint) -> SampleOutcome {
        if self.state != TrackerState::Active {
            return SampleOutcome::NotActive;
        }

        let segment_m = self.last_accepted.distance_m(&point);
        if segment_m < MIN_SEGMENT_METERS {
            return SampleOutcome::FilteredJitter;
        }
        if segment_m > MAX_SEGMENT_METERS {
            return SampleOutcome::FilteredJump;
        }

        self.distance_m += segment_m;
        self.steps = (self.distance_m / STRIDE_METERS) as u32;
        self.calories = (self.distance_m / 1000.0 * KCAL_PER_KM) as u32;
        self.last_accepted = point;
        self.route.push(point);

        let elapsed = self.elapsed_ms(point.timestamp_ms);
        if elapsed > SPEED_WARMUP_MS {
            let hours = elapsed as f64 / 3_600_000.0;
            let raw = self.distance_m / 1000.0 / hours;
            self.avg_speed_kmh = Some(raw.clamp(MIN_SPEED_KMH, MAX_SPEED_KMH));
        }

        SampleOutcome::Accepted
    }

    /// Pause the elapsed-duration clock. Valid only while active.
    pub fn pause(&mut self, at_ms: i64) -> Result<(), TrackError> {
        if self.state != TrackerState::Active {
            return Err(TrackError::InvalidTransition("pause requires active"));
        }
        self.state = TrackerState::Paused;
        self.paused_at_ms = Some(at_ms);
        Ok(())
    }

    /// Resume from pause. The paused interval is added to the pause
    /// total so it never counts toward duration.
    pub fn resume(&mut self, at_ms: i64) -> Result<(), TrackError> {
        if self.state != TrackerState::Paused {
            return Err(TrackError::InvalidTransition("resume requires paused"));
        }
        if let Some(paused_at) = self.paused_at_ms.take() {
            self.paused_total_ms += (at_ms - paused_at).max(0);
        }
        self.state = TrackerState::Active;
        Ok(())
    }

    /// Freeze accumulators and yield the completed session. The
    /// session is not yet persisted.
    pub fn stop(mut self, at_ms: i64) -> Result<WalkSession, TrackError> {
        if self.state == TrackerState::Idle {
            return Err(TrackError::InvalidTransition("stop requires active or paused"));
        }

        // A stop while paused closes the open pause interval first.
        if let Some(paused_at) = self.paused_at_ms.take() {
            self.paused_total_ms += (at_ms - paused_at).max(0);
        }
        self.state = TrackerState::Idle;

        let elapsed_ms = (at_ms - self.started_at_ms - self.paused_total_ms).max(0);
        let duration_minutes = (elapsed_ms / 60_000) as u32;

        Ok(WalkSession {
            id: self.id,
            user_id: self.user_id,
            dog_id: self.dog_id,
            scheduled_walk_id: self.scheduled_walk_id,
            start_time: datetime_from_millis(self.started_at_ms),
            end_time: Some(datetime_from_millis(at_ms)),
            duration_minutes,
            distance_km: self.distance_m / 1000.0,
            steps: self.steps,
            calories_burned: self.calories,
            start_location: self.route.first().copied(),
            end_location: self.route.last().copied(),
            route_points: self.route,
            notes: None,
            is_completed: true,
        })
    }
}

/// Registry of active trackers, keyed by session ID.
///
/// This is the RPC-style surface the app shell drives: start, feed
/// samples, pause/resume, stop. Samples for a session arrive serially
/// from the location stream.
#[derive(Default)]
pub struct SessionManager {
    sessions: DashMap<Uuid, WalkTracker>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Start a new tracking session. Requires a last-known position.
    pub fn start_session(
        &self,
        user_id: u64,
        dog_id: Option<u64>,
        scheduled_walk_id: Option<Uuid>,
        origin: Option<LocationPoint>,
    ) -> Result<Uuid, TrackError> {
        let id = Uuid::new_v4();
        let tracker = WalkTracker::start(id, user_id, dog_id, scheduled_walk_id, origin)?;
        self.sessions.insert(id, tracker);

        tracing::debug!(session_id = %id, user_id, "Tracking session started");
        Ok(id)
    }

    pub fn record_sample(
        &self,
        session_id: Uuid,
        point: LocationPoint,
    ) -> Result<SampleOutcome, TrackError> {
        let mut tracker = self
            .sessions
            .get_mut(&session_id)
            .ok_or(TrackError::UnknownSession(session_id))?;
        Ok(tracker.record_sample(point))
    }

    pub fn pause_session(&self, session_id: Uuid, at_ms: i64) -> Result<(), TrackError> {
        let mut tracker = self
            .sessions
            .get_mut(&session_id)
            .ok_or(TrackError::UnknownSession(session_id))?;
        tracker.pause(at_ms)
    }

    pub fn resume_session(&self, session_id: Uuid, at_ms: i64) -> Result<(), TrackError> {
        let mut tracker = self
            .sessions
            .get_mut(&session_id)
            .ok_or(TrackError::UnknownSession(session_id))?;
        tracker.resume(at_ms)
    }

    /// Stop the session and remove it from the registry; later samples
    /// for this ID are rejected as unknown.
    pub fn stop_session(&self, session_id: Uuid, at_ms: i64) -> Result<WalkSession, TrackError> {
        let (_, tracker) = self
            .sessions
            .remove(&session_id)
            .ok_or(TrackError::UnknownSession(session_id))?;

        let session = tracker.stop(at_ms)?;
        tracing::debug!(
            session_id = %session_id,
            distance_km = session.distance_km,
            duration_minutes = session.duration_minutes,
            "Tracking session stopped"
        );
        Ok(session)
    }
}
