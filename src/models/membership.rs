// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity membership model and the role a member holds.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a profile within an activity.
///
/// Variants are listed in descending order of management privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owner of the activity. Exactly one per activity and never reassigned.
    Creator,
    /// Helps run the activity.
    Organiser,
    /// Takes part in the activity.
    Participant,
    /// Watches the activity for updates.
    Follower,
}

impl Role {
    pub fn is_creator(&self) -> bool {
        matches!(self, Self::Creator)
    }

    /// Roles a profile may pick for itself when joining a public activity.
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, Self::Participant | Self::Follower)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Organiser => "organiser",
            Self::Participant => "participant",
            Self::Follower => "follower",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    /// Case-insensitive; accepts both "organiser" and "organizer".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "creator" => Ok(Self::Creator),
            "organiser" | "organizer" => Ok(Self::Organiser),
            "participant" => Ok(Self::Participant),
            "follower" => Ok(Self::Follower),
            _ => Err(AppError::InvalidTransition(format!("Unknown role '{}'", s))),
        }
    }
}

/// Links one profile to one activity with exactly one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityMembership {
    pub id: u64,
    pub profile_id: u64,
    pub activity_id: u64,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}
