// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Structurally invalid input, tagged with the first rule that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Activity name is blank or missing")]
    MissingName,

    #[error("Non-continuous activities must have a start date")]
    MissingStartDate,

    #[error("Non-continuous activities must have an end date")]
    MissingEndDate,

    #[error("The end date cannot be before the start date")]
    InvalidDates,

    #[error("An activity must have at least one activity type")]
    MissingTypes,

    #[error("Activity type '{0}' does not exist")]
    InvalidType(String),

    #[error("Participation title is blank")]
    MissingTitle,

    #[error("No profile uses the email(s): {}", .0.join(", "))]
    UnknownEmails(Vec<String>),

    #[error("{0}")]
    Profile(String),
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Invalid privacy level: {0}")]
    InvalidPrivacyLevel(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub(crate) fn profile_not_found(profile_id: u64) -> Self {
        AppError::NotFound(format!("No profile with id {}", profile_id))
    }

    pub(crate) fn activity_not_found(activity_id: u64) -> Self {
        AppError::NotFound(format!("No activity with id {}", activity_id))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Validation(reason) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                Some(reason.to_string()),
            ),
            AppError::InvalidTransition(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_transition",
                Some(msg.clone()),
            ),
            AppError::InvalidPrivacyLevel(level) => (
                StatusCode::BAD_REQUEST,
                "invalid_privacy_level",
                Some(format!("Unknown privacy level '{}'", level)),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
