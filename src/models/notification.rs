// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Notification model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ActivityCreated,
    ActivityEdited,
    ActivityPrivacyChanged,
    ActivityFollowerAdded,
    ActivityMemberRemoved,
}

/// A change record addressed to every member of an activity at emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    /// Activity that triggered the notification
    pub activity_id: u64,
    /// Profile that made the change
    pub editor_id: u64,
    pub notification_type: NotificationType,
    pub timestamp: DateTime<Utc>,
    /// Snapshot of the activity's members; only shrinks after creation
    pub recipients: BTreeSet<u64>,
}
