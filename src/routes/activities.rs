// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity, membership and participation routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{
    api_timestamp, ActivityDraft, ActivityParticipation, ParticipationDraft, PrivacyLevel, Role,
};
use crate::routes::PageQuery;
use crate::services::{ActivityView, MemberShare, ProfileView, RoleCounts};
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

/// Activity routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", get(list_activities).post(create_activity))
        .route(
            "/api/activities/{id}",
            get(get_activity).put(update_activity).delete(delete_activity),
        )
        .route("/api/activities/{id}/privacy", put(edit_privacy))
        .route("/api/activities/{id}/role-counts", get(role_counts))
        .route(
            "/api/activities/{id}/members",
            get(list_members).post(add_member),
        )
        .route(
            "/api/activities/{id}/members/{profile_id}",
            get(get_member_role)
                .put(set_member_role)
                .delete(remove_member),
        )
        .route(
            "/api/activities/{id}/roles/{role}",
            axum::routing::delete(clear_role),
        )
        .route(
            "/api/activities/{id}/participations",
            get(list_participations).post(create_participation),
        )
        .route(
            "/api/participations/{id}",
            get(get_participation)
                .put(edit_participation)
                .delete(delete_participation),
        )
}

// ─── Activities ──────────────────────────────────────────────

/// Id of a newly created resource.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreatedResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
}

#[derive(Deserialize)]
struct ActivitiesQuery {
    /// Privacy level to list; defaults to public
    privacy: Option<String>,
}

/// List activities at one privacy level. Only admins may list
/// non-public activities; the service checks the stored auth level.
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<Vec<ActivityView>>> {
    let privacy = match params.privacy.as_deref() {
        Some(raw) => raw.parse()?,
        None => PrivacyLevel::Public,
    };
    Ok(Json(
        state
            .activity_service
            .activities_with_privacy(user.profile_id, privacy)?,
    ))
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<ActivityDraft>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let id = state.activity_service.create(&draft, user.profile_id)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<ActivityView>> {
    Ok(Json(state.activity_service.read(id, user.profile_id)?))
}

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(draft): Json<ActivityDraft>,
) -> Result<StatusCode> {
    state.activity_service.update(&draft, id, user.profile_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    state.activity_service.delete(id, user.profile_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Privacy ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct PrivacyRequest {
    privacy: String,
    /// Profiles to share with when moving to friends
    #[serde(default)]
    members: Option<Vec<MemberShare>>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PrivacyResponse {
    pub privacy: String,
    pub privacy_level: u8,
}

async fn edit_privacy(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(body): Json<PrivacyRequest>,
) -> Result<Json<PrivacyResponse>> {
    let level = state.privacy_service.edit_activity_privacy(
        &body.privacy,
        id,
        user.profile_id,
        body.members.as_deref(),
    )?;
    Ok(Json(PrivacyResponse {
        privacy: level.to_string(),
        privacy_level: level.level(),
    }))
}

// ─── Members ─────────────────────────────────────────────────

async fn role_counts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<RoleCounts>> {
    Ok(Json(state.membership_service.get_role_counts(id)?))
}

#[derive(Deserialize)]
struct RoleQuery {
    role: String,
}

async fn list_members(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(params): Query<RoleQuery>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<ProfileView>>> {
    let role: Role = params.role.parse()?;
    let (offset, limit) = page.bounds()?;
    let members = state
        .membership_service
        .get_members(id, role, offset, limit)?;
    Ok(Json(members.iter().map(ProfileView::from).collect()))
}

#[derive(Deserialize)]
struct AddMemberRequest {
    profile_id: u64,
    role: String,
}

async fn add_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(body): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let role: Role = body.role.parse()?;
    let membership_id =
        state
            .membership_service
            .add_activity_role(id, user.profile_id, body.profile_id, role)?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: membership_id })))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoleResponse {
    pub role: String,
}

async fn get_member_role(
    State(state): State<Arc<AppState>>,
    Path((id, profile_id)): Path<(u64, u64)>,
) -> Result<Json<RoleResponse>> {
    let role = state.membership_service.get_profile_role(profile_id, id)?;
    Ok(Json(RoleResponse {
        role: role.to_string(),
    }))
}

#[derive(Deserialize)]
struct SetRoleRequest {
    role: String,
}

async fn set_member_role(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, profile_id)): Path<(u64, u64)>,
    Json(body): Json<SetRoleRequest>,
) -> Result<StatusCode> {
    let role: Role = body.role.parse()?;
    state
        .membership_service
        .set_profile_role(profile_id, user.profile_id, id, role)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, profile_id)): Path<(u64, u64)>,
) -> Result<StatusCode> {
    state
        .membership_service
        .remove_membership(user.profile_id, profile_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClearRoleResponse {
    pub removed: usize,
}

async fn clear_role(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, role)): Path<(u64, String)>,
) -> Result<Json<ClearRoleResponse>> {
    let role: Role = role.parse()?;
    let removed = state
        .membership_service
        .clear_role(user.profile_id, id, role)?;
    Ok(Json(ClearRoleResponse { removed }))
}

// ─── Participations ──────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ParticipationResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub profile_id: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub activity_id: u64,
    pub title: String,
    pub details: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl From<ActivityParticipation> for ParticipationResponse {
    fn from(p: ActivityParticipation) -> Self {
        Self {
            id: p.id,
            profile_id: p.profile_id,
            activity_id: p.activity_id,
            title: p.title,
            details: p.details,
            start_time: p.start_time.map(api_timestamp),
            end_time: p.end_time.map(api_timestamp),
        }
    }
}

async fn list_participations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<ParticipationResponse>>> {
    let participations = state
        .participation_service
        .for_activity(user.profile_id, id)?;
    Ok(Json(
        participations
            .into_iter()
            .map(ParticipationResponse::from)
            .collect(),
    ))
}

async fn create_participation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(draft): Json<ParticipationDraft>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let participation_id = state
        .participation_service
        .create(user.profile_id, id, &draft)?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: participation_id,
        }),
    ))
}

async fn get_participation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Json<ParticipationResponse>> {
    Ok(Json(
        state
            .participation_service
            .get(user.profile_id, id)?
            .into(),
    ))
}

async fn edit_participation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(draft): Json<ParticipationDraft>,
) -> Result<StatusCode> {
    state
        .participation_service
        .edit(user.profile_id, id, &draft)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_participation(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    state.participation_service.delete(user.profile_id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
