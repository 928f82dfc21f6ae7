//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, JoinResult, SessionQueryCursor};

/// Collection names as constants.
pub mod collections {
    pub const WALK_SESSIONS: &str = "walk_sessions";
    /// User stats aggregates (keyed by user_id)
    pub const USER_STATS: &str = "user_stats";
    pub const WALK_SCHEDULES: &str = "walk_schedules";
    /// One document per (walk_id, user_id)
    pub const WALK_PARTICIPANTS: &str = "walk_participants";
}
