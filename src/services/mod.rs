// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod broadcast;
pub mod sampler;
pub mod schedule;
pub mod stats;
pub mod submit;
pub mod tracker;

pub use broadcast::{ScheduleBroadcaster, ScheduleSubscription};
pub use sampler::{GeoSampler, SamplerConfig};
pub use schedule::{NewSchedule, ScheduleChanges, ScheduleEngine, ScheduleFilters};
pub use stats::{StatsPeriod, StatsService};
pub use submit::{LocalLedger, SubmissionClient, SubmitOutcome};
pub use tracker::{SampleOutcome, SessionManager, TrackError, TrackerState, WalkTracker};
