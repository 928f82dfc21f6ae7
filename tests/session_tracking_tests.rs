// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end tracking scenarios: sampler gate -> session builder ->
//! completed session.

use pawtrail::models::LocationPoint;
use pawtrail::services::{GeoSampler, SamplerConfig, SampleOutcome, SessionManager, TrackError};

/// Degrees of latitude per meter, near the equator-ish test fixture.
const METERS_TO_LAT: f64 = 1.0 / 111_195.0;

fn fix(meters_north: f64, ts_ms: i64) -> LocationPoint {
    LocationPoint::new(37.0 + meters_north * METERS_TO_LAT, -122.0, ts_ms)
}

#[test]
fn test_full_walk_with_noise_and_pause() {
    let manager = SessionManager::new();

    let id = manager
        .start_session(42, Some(7), None, Some(fix(0.0, 0)))
        .unwrap();

    // Ten clean segments of 10 m each, 10 s apart
    let mut pos = 0.0;
    for i in 1..=10 {
        pos += 10.0;
        let outcome = manager.record_sample(id, fix(pos, i * 10_000)).unwrap();
        assert_eq!(outcome, SampleOutcome::Accepted);
    }

    // GPS noise: jitter under 2 m and a 200 m jump, both discarded
    assert_eq!(
        manager.record_sample(id, fix(pos + 0.5, 101_000)).unwrap(),
        SampleOutcome::FilteredJitter
    );
    assert_eq!(
        manager.record_sample(id, fix(pos + 200.0, 102_000)).unwrap(),
        SampleOutcome::FilteredJump
    );

    // Water break: paused time must not count toward duration
    manager.pause_session(id, 110_000).unwrap();
    assert_eq!(
        manager.record_sample(id, fix(pos + 10.0, 115_000)).unwrap(),
        SampleOutcome::NotActive
    );
    manager.resume_session(id, 170_000).unwrap();

    // One more clean segment after the break
    pos += 10.0;
    assert_eq!(
        manager.record_sample(id, fix(pos, 180_000)).unwrap(),
        SampleOutcome::Accepted
    );

    // Stop at 4 minutes wall clock, 1 minute of it paused
    let session = manager.stop_session(id, 240_000).unwrap();

    assert_eq!(session.duration_minutes, 3);
    assert!(session.is_completed);
    assert!(session.is_well_formed());

    // 11 accepted segments of ~10 m
    let distance_m = session.distance_km * 1000.0;
    assert!((distance_m - 110.0).abs() < 0.5, "got {}", distance_m);
    // floor(110 / 0.75) = 146 steps, floor(0.11 km * 50) = 5 kcal
    assert_eq!(session.steps, 146);
    assert_eq!(session.calories_burned, 5);

    // Origin + 11 accepted points
    assert_eq!(session.route_points.len(), 12);
    assert_eq!(session.start_location, Some(fix(0.0, 0)));
}

#[test]
fn test_sampler_feeds_tracker() {
    let mut sampler = GeoSampler::new(SamplerConfig::default());
    let manager = SessionManager::new();

    // Raw fixes arrive every second; the sampler thins them to the
    // 2-second cadence before they reach the tracker.
    let mut raw_fixes = Vec::new();
    for i in 0..20 {
        raw_fixes.push(fix(i as f64 * 5.0, i * 1_000));
    }

    let first = sampler.offer(raw_fixes[0]).unwrap();
    let id = manager
        .start_session(42, None, None, sampler.last_known())
        .unwrap();
    assert_eq!(first, fix(0.0, 0));

    let mut forwarded = 0;
    for raw in &raw_fixes[1..] {
        if let Some(accepted) = sampler.offer(*raw) {
            manager.record_sample(id, accepted).unwrap();
            forwarded += 1;
        }
    }

    // Every other raw fix passes the 2 s interval gate
    assert_eq!(forwarded, 9);

    let session = manager.stop_session(id, 20_000).unwrap();
    let distance_m = session.distance_km * 1000.0;
    // 9 forwarded segments of ~10 m each
    assert!((distance_m - 90.0).abs() < 0.5, "got {}", distance_m);
}

#[test]
fn test_start_without_fix_fails_cleanly() {
    let manager = SessionManager::new();

    let err = manager.start_session(42, None, None, None);
    assert!(matches!(err, Err(TrackError::PermissionDenied)));

    // A failed start leaves no session behind
    let sampler = GeoSampler::new(SamplerConfig::default());
    assert!(sampler.last_known().is_none());
}
