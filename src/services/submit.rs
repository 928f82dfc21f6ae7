// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Walk session submission client.
//!
//! Submits completed sessions to the backend. A failed submission does
//! not lose the walk: the session is parked in the local ledger, counts
//! toward local-only totals, and can be retried later. Synced and
//! locally-saved are distinct outcomes the UI must tell apart.

use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::WalkSession;

/// Network submission timeout. A slower backend is treated as a
/// recoverable failure, not a hang.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Floor clamps applied before submission so degenerate zero-value
/// records never reach the backend.
const MIN_DURATION_MINUTES: u32 = 1;
const MIN_DISTANCE_KM: f64 = 0.01;

/// Submission failures.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Session has not been completed")]
    NotCompleted,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Result of a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend accepted the session
    Synced { id: Uuid, stats_updated: bool },
    /// The backend was unreachable; the session is held locally and
    /// will sync on a later retry
    SavedLocally { pending_id: Uuid },
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: Uuid,
    #[serde(default)]
    stats_updated: bool,
}

/// Local-only aggregates for sessions that have not synced yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalTotals {
    pub walks: u32,
    pub distance_km: f64,
    pub duration_minutes: u64,
}

/// Holds unsynced sessions and their local-only totals.
///
/// Two-phase apply: a session enters as pending, and is replaced in
/// place by the authoritative backend record when a retry succeeds.
#[derive(Default)]
pub struct LocalLedger {
    pending: DashMap<Uuid, WalkSession>,
    totals: Mutex<LocalTotals>,
}

impl LocalLedger {
    /// Park a session locally and fold it into local totals.
    pub fn record(&self, session: WalkSession) {
        {
            let mut totals = self.totals.lock().unwrap_or_else(|e| e.into_inner());
            totals.walks += 1;
            totals.distance_km += session.distance_km;
            totals.duration_minutes += u64::from(session.duration_minutes);
        }
        self.pending.insert(session.id, session);
    }

    /// Remove a session that the backend has now accepted.
    pub fn resolve(&self, pending_id: Uuid) {
        if let Some((_, session)) = self.pending.remove(&pending_id) {
            let mut totals = self.totals.lock().unwrap_or_else(|e| e.into_inner());
            totals.walks = totals.walks.saturating_sub(1);
            totals.distance_km = (totals.distance_km - session.distance_km).max(0.0);
            totals.duration_minutes = totals
                .duration_minutes
                .saturating_sub(u64::from(session.duration_minutes));
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn totals(&self) -> LocalTotals {
        *self.totals.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pending_sessions(&self) -> Vec<WalkSession> {
        self.pending.iter().map(|e| e.value().clone()).collect()
    }
}

/// HTTP client for submitting walk sessions to the backend.
pub struct SubmissionClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: String,
    ledger: LocalLedger,
}

impl SubmissionClient {
    pub fn new(base_url: String, auth_token: String) -> Result<Self, SubmitError> {
        let http = reqwest::Client::builder()
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .map_err(|e| SubmitError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            auth_token,
            ledger: LocalLedger::default(),
        })
    }

    pub fn ledger(&self) -> &LocalLedger {
        &self.ledger
    }

    /// Submit a completed session.
    ///
    /// On backend failure the session is recorded locally and the call
    /// still succeeds with `SavedLocally`; the caller decides when to
    /// retry. Submission is idempotent server-side, so retrying a
    /// session that actually landed is harmless.
    pub async fn submit(&self, session: &WalkSession) -> Result<SubmitOutcome, SubmitError> {
        if !session.is_completed {
            return Err(SubmitError::NotCompleted);
        }

        let payload = clamp_for_submission(session.clone());

        match self.post_session(&payload).await {
            Ok(response) => {
                tracing::info!(
                    session_id = %response.id,
                    stats_updated = response.stats_updated,
                    "Walk session synced"
                );
                Ok(SubmitOutcome::Synced {
                    id: response.id,
                    stats_updated: response.stats_updated,
                })
            }
            Err(reason) => {
                tracing::warn!(
                    session_id = %payload.id,
                    error = %reason,
                    "Submission failed, saving walk locally"
                );
                let pending_id = payload.id;
                self.ledger.record(payload);
                Ok(SubmitOutcome::SavedLocally { pending_id })
            }
        }
    }

    /// Re-submit everything in the local ledger. Sessions the backend
    /// accepts are resolved in place; the rest stay pending.
    pub async fn retry_pending(&self) -> usize {
        let mut synced = 0;

        for session in self.ledger.pending_sessions() {
            if let Ok(response) = self.post_session(&session).await {
                self.ledger.resolve(session.id);
                tracing::info!(session_id = %response.id, "Pending walk synced");
                synced += 1;
            }
        }

        synced
    }

    async fn post_session(&self, session: &WalkSession) -> Result<SubmitResponse, String> {
        let url = format!("{}/api/walks", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(session)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("backend returned {}", response.status()));
        }

        response.json::<SubmitResponse>().await.map_err(|e| e.to_string())
    }
}

/// Apply the defensive minimum clamps.
fn clamp_for_submission(mut session: WalkSession) -> WalkSession {
    session.duration_minutes = session.duration_minutes.max(MIN_DURATION_MINUTES);
    session.distance_km = session.distance_km.max(MIN_DISTANCE_KM);
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_session(duration_minutes: u32, distance_km: f64) -> WalkSession {
        WalkSession {
            id: Uuid::new_v4(),
            user_id: 42,
            dog_id: None,
            scheduled_walk_id: None,
            start_time: Utc::now(),
            end_time: Some(Utc::now()),
            duration_minutes,
            distance_km,
            steps: 0,
            calories_burned: 0,
            route_points: vec![],
            start_location: None,
            end_location: None,
            notes: None,
            is_completed: true,
        }
    }

    #[test]
    fn test_clamps_apply_floors() {
        let clamped = clamp_for_submission(make_session(0, 0.0));
        assert_eq!(clamped.duration_minutes, 1);
        assert_eq!(clamped.distance_km, 0.01);
    }

    #[test]
    fn test_clamps_leave_real_values_alone() {
        let clamped = clamp_for_submission(make_session(32, 2.1));
        assert_eq!(clamped.duration_minutes, 32);
        assert_eq!(clamped.distance_km, 2.1);
    }

    #[test]
    fn test_ledger_records_and_resolves() {
        let ledger = LocalLedger::default();
        let session = make_session(30, 2.0);
        let id = session.id;

        ledger.record(session);
        assert_eq!(ledger.pending_count(), 1);
        assert_eq!(ledger.totals().walks, 1);
        assert_eq!(ledger.totals().distance_km, 2.0);

        ledger.resolve(id);
        assert_eq!(ledger.pending_count(), 0);
        assert_eq!(ledger.totals(), LocalTotals::default());
    }

    #[test]
    fn test_ledger_resolve_unknown_is_noop() {
        let ledger = LocalLedger::default();
        ledger.record(make_session(30, 2.0));
        ledger.resolve(Uuid::new_v4());
        assert_eq!(ledger.pending_count(), 1);
        assert_eq!(ledger.totals().walks, 1);
    }

    #[tokio::test]
    async fn test_incomplete_session_rejected() {
        let client = SubmissionClient::new(
            "http://localhost:0".to_string(),
            "test-token".to_string(),
        )
        .unwrap();

        let mut session = make_session(30, 2.0);
        session.is_completed = false;

        let err = client.submit(&session).await;
        assert!(matches!(err, Err(SubmitError::NotCompleted)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_saves_locally() {
        // Port 9 (discard) refuses connections immediately
        let client = SubmissionClient::new(
            "http://127.0.0.1:9".to_string(),
            "test-token".to_string(),
        )
        .unwrap();

        let session = make_session(30, 2.0);
        let expected_id = session.id;

        let outcome = client.submit(&session).await.unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::SavedLocally {
                pending_id: expected_id
            }
        );
        assert_eq!(client.ledger().pending_count(), 1);
        assert_eq!(client.ledger().totals().walks, 1);
    }
}
