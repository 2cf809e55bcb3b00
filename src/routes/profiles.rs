// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes: account data, auth levels, notifications and activity lists.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    api_timestamp, EmailUpdate, Notification, PasswordChange, ProfileLocation, ProfileSearch,
    ProfileUpdate, Role,
};
use crate::routes::auth::blocking;
use crate::routes::PageQuery;
use crate::services::{ActivityView, ProfileView};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Default number of notifications returned per request.
const DEFAULT_NOTIFICATION_COUNT: usize = 20;
const MAX_NOTIFICATION_COUNT: usize = 100;

/// Profile routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/profiles", get(search_profiles))
        .route(
            "/api/profiles/{id}",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        .route("/api/profiles/{id}/emails", put(update_emails))
        .route("/api/profiles/{id}/password", put(change_password))
        .route(
            "/api/profiles/{id}/location",
            put(update_location).delete(delete_location),
        )
        .route("/api/profiles/{id}/activity-types", put(update_activity_types))
        .route("/api/profiles/{id}/auth-level", put(set_auth_level))
        .route("/api/profiles/{id}/notifications", get(get_notifications))
        .route("/api/profiles/{id}/activities", get(get_activities_by_role))
}

/// Reject access to another profile's private data unless the caller is an admin.
fn require_self_or_admin(state: &AppState, user: &AuthUser, profile_id: u64) -> Result<()> {
    if user.profile_id == profile_id || state.db.read(|t| Ok(t.is_admin(user.profile_id)))? {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Profile {} may not access profile {}",
            user.profile_id, profile_id
        )))
    }
}

// ─── Profile ─────────────────────────────────────────────────

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileView>> {
    let profile = state.profile_service.get(user.profile_id)?;
    Ok(Json(ProfileView::from(&profile)))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<ProfileView>> {
    let profile = state.profile_service.get(id)?;
    Ok(Json(ProfileView::from(&profile)))
}

/// Search profiles by name, email or activity type interests.
async fn search_profiles(
    State(state): State<Arc<AppState>>,
    Query(search): Query<ProfileSearch>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ProfileView>>> {
    let (offset, limit) = page.bounds()?;
    let profiles = state.profile_service.search(&search, offset, limit)?;
    Ok(Json(profiles.iter().map(ProfileView::from).collect()))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<ProfileView>> {
    state
        .profile_service
        .update_profile(user.profile_id, id, &body)?;
    let profile = state.profile_service.get(id)?;
    Ok(Json(ProfileView::from(&profile)))
}

async fn update_emails(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(body): Json<EmailUpdate>,
) -> Result<StatusCode> {
    state
        .profile_service
        .update_emails(user.profile_id, id, &body)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(body): Json<PasswordChange>,
) -> Result<StatusCode> {
    let profiles = state.profile_service.clone();
    blocking(move || profiles.change_password(user.profile_id, id, &body)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(body): Json<ProfileLocation>,
) -> Result<StatusCode> {
    state
        .profile_service
        .update_location(user.profile_id, id, &body)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    state.profile_service.delete_location(user.profile_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ActivityTypesRequest {
    activity_types: Vec<String>,
}

async fn update_activity_types(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(body): Json<ActivityTypesRequest>,
) -> Result<StatusCode> {
    state
        .profile_service
        .update_activity_types(user.profile_id, id, &body.activity_types)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    state.profile_service.delete_profile(user.profile_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct AuthLevelRequest {
    auth_level: u8,
}

async fn set_auth_level(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(body): Json<AuthLevelRequest>,
) -> Result<StatusCode> {
    state
        .profile_service
        .set_auth_level(user.profile_id, id, body.auth_level)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Notifications ───────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NotificationResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub message: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub activity_id: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub editor_id: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub notification_type: crate::models::NotificationType,
    pub timestamp: String,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            message: n.message,
            activity_id: n.activity_id,
            editor_id: n.editor_id,
            notification_type: n.notification_type,
            timestamp: api_timestamp(n.timestamp),
        }
    }
}

#[derive(Deserialize)]
struct NotificationsQuery {
    #[serde(default = "default_count")]
    count: usize,
    #[serde(default)]
    start: usize,
}

fn default_count() -> usize {
    DEFAULT_NOTIFICATION_COUNT
}

async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Query(params): Query<NotificationsQuery>,
) -> Result<Json<Vec<NotificationResponse>>> {
    require_self_or_admin(&state, &user, id)?;
    let notifications = state.notification_service.get_sorted_notifications(
        id,
        params.count.min(MAX_NOTIFICATION_COUNT),
        params.start,
    )?;
    Ok(Json(
        notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    ))
}

// ─── Activities ──────────────────────────────────────────────

#[derive(Deserialize)]
struct RoleQuery {
    role: String,
}

async fn get_activities_by_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(params): Query<RoleQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ActivityView>>> {
    let role: Role = params.role.parse()?;
    let (offset, limit) = page.bounds()?;
    Ok(Json(
        state
            .activity_service
            .activities_for_profile_by_role(id, role, offset, limit)?,
    ))
}
