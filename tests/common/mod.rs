// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, Utc};
use fitness_tracker::config::Config;
use fitness_tracker::db::MemoryDb;
use fitness_tracker::middleware::auth::create_jwt;
use fitness_tracker::models::{auth_level, Email, Gender, Profile};
use fitness_tracker::routes::create_router;
use fitness_tracker::AppState;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tower::ServiceExt;

/// Create a test app backed by a fresh store with the reference activity
/// types loaded. Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    let config = Config::test_default();
    let state = Arc::new(AppState::new(config, MemoryDb::new()));
    state
        .profile_service
        .seed_activity_types(&state.config.activity_types)
        .unwrap();
    (create_router(state.clone()), state)
}

/// Create a test JWT token.
#[allow(dead_code)]
pub fn create_test_jwt(profile_id: u64, level: u8, signing_key: &[u8]) -> String {
    create_jwt(profile_id, level, signing_key, 1).unwrap()
}

/// Insert a profile directly, skipping password hashing.
#[allow(dead_code)]
pub fn seed_profile(state: &AppState, email: &str, level: u8) -> u64 {
    state
        .db
        .transaction(|t| {
            let id = t.next_id();
            t.insert_profile(Profile {
                id,
                firstname: "Test".to_string(),
                lastname: format!("Profile{}", id),
                middlename: None,
                nickname: None,
                bio: None,
                gender: Gender::NonBinary,
                fitness_level: 2,
                date_of_birth: NaiveDate::from_ymd_opt(1992, 2, 29).unwrap(),
                auth_level: level,
                emails: vec![Email {
                    address: email.to_string(),
                    primary: true,
                }],
                password_hash: String::new(),
                location: None,
                activity_types: BTreeSet::new(),
                created_at: Utc::now(),
            });
            Ok(id)
        })
        .unwrap()
}

/// Seed a normal user and return its id and a bearer token.
#[allow(dead_code)]
pub fn seed_user(state: &AppState, email: &str) -> (u64, String) {
    let id = seed_profile(state, email, auth_level::USER);
    let token = create_test_jwt(id, auth_level::USER, &state.config.jwt_signing_key);
    (id, token)
}

/// Send one request and decode the JSON body (Null when empty).
#[allow(dead_code)]
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Body for a one-day hiking activity.
#[allow(dead_code)]
pub fn activity_body(name: &str, types: &[&str]) -> Value {
    serde_json::json!({
        "name": name,
        "description": "A big and nice race on a lovely peninsula",
        "continuous": false,
        "start_time": "2026-03-01T08:00:00Z",
        "end_time": "2026-03-01T14:00:00Z",
        "location": "Kaikoura, NZ",
        "activity_types": types,
    })
}
