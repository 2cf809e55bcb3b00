// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity model for storage and API.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Visibility of an activity. The numeric level is what clients store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    #[default]
    Private,
    Friends,
    Public,
}

impl PrivacyLevel {
    pub fn level(&self) -> u8 {
        match self {
            Self::Private => 0,
            Self::Friends => 1,
            Self::Public => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Friends => "friends",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "friends" => Ok(Self::Friends),
            "public" => Ok(Self::Public),
            _ => Err(AppError::InvalidPrivacyLevel(s.to_string())),
        }
    }
}

/// Stored activity record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: u64,
    /// Unique across all activities
    pub name: String,
    pub description: String,
    /// Continuous activities have no time window
    pub continuous: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub location: Option<String>,
    /// Ids of the reference activity types this activity is tagged with
    pub activity_types: BTreeSet<u64>,
    pub privacy: PrivacyLevel,
    pub created_at: DateTime<Utc>,
}

/// Client-supplied activity fields for create and update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub continuous: bool,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    /// Activity type names, e.g. "Hiking"
    #[serde(default)]
    pub activity_types: Vec<String>,
    /// Initial privacy on create. Ignored on update.
    #[serde(default)]
    pub privacy: Option<PrivacyLevel>,
}

impl ActivityDraft {
    /// Start and end as stored: continuous activities carry no time window.
    pub fn time_window(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        if self.continuous {
            (None, None)
        } else {
            (self.start_time, self.end_time)
        }
    }
}

/// Reference activity type with a reverse index of tagged activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityType {
    pub id: u64,
    pub name: String,
    pub activities: BTreeSet<u64>,
}
