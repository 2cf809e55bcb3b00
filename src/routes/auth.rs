// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Registration and session routes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::ProfileDraft;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Session issued on login or registration.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub profile_id: u64,
    pub token: String,
}

/// Build the session cookie and body for a profile.
fn start_session(
    state: &AppState,
    jar: CookieJar,
    profile_id: u64,
    auth_level: u8,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let token = create_jwt(
        profile_id,
        auth_level,
        &state.config.jwt_signing_key,
        state.config.session_days,
    )?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Json(SessionResponse { profile_id, token })))
}

/// Run password hashing off the async executor.
pub(crate) async fn blocking<T: Send + 'static>(
    f: impl FnOnce() -> Result<T> + Send + 'static,
) -> Result<T> {
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Blocking task failed: {}", e)))?
}

async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(draft): Json<ProfileDraft>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    let profiles = state.profile_service.clone();
    let profile_id = blocking(move || profiles.register(&draft)).await?;
    let (jar, body) = start_session(&state, jar, profile_id, crate::models::auth_level::USER)?;
    Ok((StatusCode::CREATED, jar, body))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let profiles = state.profile_service.clone();
    let profile = blocking(move || profiles.login(&body.email, &body.password)).await?;
    start_session(&state, jar, profile.id, profile.auth_level)
}

/// Logout - clears the session cookie. Tokens are stateless, so nothing is
/// revoked server-side.
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}
