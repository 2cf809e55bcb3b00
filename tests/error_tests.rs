// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use fitness_tracker::error::{AppError, ValidationError};
use serde_json::Value;

async fn render(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_status_mapping() {
    let cases = [
        (AppError::NotFound("x".to_string()), StatusCode::NOT_FOUND, "not_found"),
        (
            AppError::InvalidTransition("x".to_string()),
            StatusCode::BAD_REQUEST,
            "invalid_transition",
        ),
        (
            AppError::InvalidPrivacyLevel("everyone".to_string()),
            StatusCode::BAD_REQUEST,
            "invalid_privacy_level",
        ),
        (AppError::Forbidden("x".to_string()), StatusCode::FORBIDDEN, "forbidden"),
        (AppError::Conflict("x".to_string()), StatusCode::CONFLICT, "conflict"),
        (AppError::Unauthorized, StatusCode::UNAUTHORIZED, "unauthorized"),
    ];

    for (err, status, code) in cases {
        let (got_status, body) = render(err).await;
        assert_eq!(got_status, status);
        assert_eq!(body["error"], code);
    }
}

#[tokio::test]
async fn test_validation_error_carries_reason() {
    let (status, body) = render(ValidationError::MissingEndDate.into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"], "Non-continuous activities must have an end date");

    let emails = vec!["a@example.com".to_string(), "b@example.com".to_string()];
    let (_, body) = render(ValidationError::UnknownEmails(emails).into()).await;
    assert_eq!(body["details"], "No profile uses the email(s): a@example.com, b@example.com");
}

#[tokio::test]
async fn test_internal_errors_hide_details() {
    let (status, body) = render(AppError::Database("lock poisoned".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());

    let (status, body) = render(anyhow::anyhow!("boom").into()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
}
