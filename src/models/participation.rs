// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Logged participation outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-text result a member records against an activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityParticipation {
    pub id: u64,
    pub profile_id: u64,
    pub activity_id: u64,
    pub title: String,
    pub details: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipationDraft {
    pub title: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}
