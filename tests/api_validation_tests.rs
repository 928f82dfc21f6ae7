// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request validation tests for the protected API surface.
//!
//! These run against the offline mock database: every rejection here
//! must happen before any persistence call.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use pawtrail::middleware::auth::create_jwt;
use serde_json::json;
use tower::ServiceExt;

mod common;

const USER_ID: u64 = 12345;

fn authed_request(token: &str, method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_schedule_duration_out_of_range_rejected() {
    let (app, state) = common::create_test_app();
    let token = create_jwt(USER_ID, &state.config.jwt_signing_key).unwrap();

    let body = json!({
        "title": "Quick loop",
        "scheduled_date": "2030-06-01",
        "scheduled_time": "08:30:00",
        "duration_minutes": 5,
        "location_name": "Dog park"
    });

    let response = app
        .oneshot(authed_request(&token, "POST", "/api/schedules", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schedule_empty_title_rejected() {
    let (app, state) = common::create_test_app();
    let token = create_jwt(USER_ID, &state.config.jwt_signing_key).unwrap();

    let body = json!({
        "title": "",
        "scheduled_date": "2030-06-01",
        "scheduled_time": "08:30:00",
        "location_name": "Dog park"
    });

    let response = app
        .oneshot(authed_request(&token, "POST", "/api/schedules", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_walk_history_invalid_cursor_rejected() {
    let (app, state) = common::create_test_app();
    let token = create_jwt(USER_ID, &state.config.jwt_signing_key).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/walks?cursor=not-a-cursor")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_walk_for_other_user_forbidden() {
    let (app, state) = common::create_test_app();
    let token = create_jwt(USER_ID, &state.config.jwt_signing_key).unwrap();

    let body = json!({
        "id": "7f8a1c22-4f5b-4a97-9d40-1d2ad3c1b111",
        "user_id": USER_ID + 1,
        "start_time": "2024-03-10T10:00:00Z",
        "duration_minutes": 32,
        "distance_km": 2.1,
        "steps": 2800,
        "calories_burned": 105,
        "route_points": [],
        "is_completed": true
    });

    let response = app
        .oneshot(authed_request(&token, "POST", "/api/walks", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_submit_incomplete_walk_rejected() {
    let (app, state) = common::create_test_app();
    let token = create_jwt(USER_ID, &state.config.jwt_signing_key).unwrap();

    let body = json!({
        "id": "7f8a1c22-4f5b-4a97-9d40-1d2ad3c1b111",
        "user_id": USER_ID,
        "start_time": "2024-03-10T10:00:00Z",
        "duration_minutes": 32,
        "distance_km": 2.1,
        "steps": 2800,
        "calories_burned": 105,
        "route_points": [],
        "is_completed": false
    });

    let response = app
        .oneshot(authed_request(&token, "POST", "/api/walks", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_unordered_route_rejected() {
    let (app, state) = common::create_test_app();
    let token = create_jwt(USER_ID, &state.config.jwt_signing_key).unwrap();

    let body = json!({
        "id": "7f8a1c22-4f5b-4a97-9d40-1d2ad3c1b111",
        "user_id": USER_ID,
        "start_time": "2024-03-10T10:00:00Z",
        "duration_minutes": 32,
        "distance_km": 2.1,
        "steps": 2800,
        "calories_burned": 105,
        "route_points": [
            { "latitude": 37.0, "longitude": -122.0, "timestamp_ms": 5000 },
            { "latitude": 37.0001, "longitude": -122.0, "timestamp_ms": 1000 }
        ],
        "is_completed": true
    });

    let response = app
        .oneshot(authed_request(&token, "POST", "/api/walks", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
