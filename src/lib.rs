// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Pawtrail: walk tracking, statistics, and shared walk scheduling.
//!
//! This crate provides the core of a dog-walking companion app: the
//! on-device GPS walk session builder, session submission with local
//! fallback, server-side statistics aggregation, and a walk scheduling
//! engine with real-time update fan-out to subscribed clients.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::FirestoreDb;
use services::{ScheduleBroadcaster, ScheduleEngine, StatsService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub stats: StatsService,
    pub schedules: ScheduleEngine,
    pub broadcaster: Arc<ScheduleBroadcaster>,
}
