// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pawtrail API Server
//!
//! Persists submitted walk sessions, aggregates per-user statistics,
//! and manages shared walk schedules with live update fan-out.

use pawtrail::{
    config::Config,
    db::FirestoreDb,
    services::{ScheduleBroadcaster, ScheduleEngine, StatsService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Pawtrail API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Schedule update fan-out, shared by the engine and the SSE routes
    let broadcaster = Arc::new(ScheduleBroadcaster::new());

    let stats = StatsService::new(db.clone());
    let schedules = ScheduleEngine::new(db.clone(), Arc::clone(&broadcaster));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        stats,
        schedules,
        broadcaster,
    });

    // Build router
    let app = pawtrail::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pawtrail=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
