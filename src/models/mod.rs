// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod membership;
pub mod notification;
pub mod participation;
pub mod profile;

pub use activity::{Activity, ActivityDraft, ActivityType, PrivacyLevel};
pub use membership::{ActivityMembership, Role};
pub use notification::{Notification, NotificationType};
pub use participation::{ActivityParticipation, ParticipationDraft};
pub use profile::{
    auth_level, Email, EmailUpdate, Gender, PasswordChange, Profile, ProfileDraft, ProfileLocation,
    ProfileSearch, ProfileUpdate, SearchMethod,
};

use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps in API responses: whole seconds, `Z` suffix.
pub fn api_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
