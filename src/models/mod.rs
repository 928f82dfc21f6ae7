// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod location;
pub mod schedule;
pub mod session;
pub mod stats;

pub use location::LocationPoint;
pub use schedule::{
    ParticipantStatus, ScheduleEvent, ScheduleEventType, ScheduleStatus, WalkParticipant,
    WalkSchedule,
};
pub use session::WalkSession;
pub use stats::{DailyBucket, StatsReport, UserStatistics, WalkMetrics};
