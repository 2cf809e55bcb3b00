// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notification fan-out and per-profile notification feeds.
//!
//! A notification is addressed to every member of the activity at the moment it
//! is recorded. Later membership changes never touch the recipients of
//! notifications that already exist.

use crate::db::{MemoryDb, Tables};
use crate::error::{AppError, Result};
use crate::models::{Notification, NotificationType, Profile};
use chrono::Utc;

/// Record one notification addressed to the current members of `activity_id`.
///
/// The activity is assumed to exist; callers resolve it first. Runs inside the
/// caller's transaction so the recipient snapshot lands together with the change
/// that triggered it.
pub fn fan_out(
    tables: &mut Tables,
    notification_type: NotificationType,
    activity_id: u64,
    editor_id: u64,
    message: String,
) -> u64 {
    let recipients = tables.member_ids(activity_id);
    let id = tables.next_id();

    tracing::debug!(
        notification_id = id,
        activity_id,
        editor_id,
        ?notification_type,
        recipients = recipients.len(),
        "Recording notification"
    );

    tables.insert_notification(Notification {
        id,
        message,
        activity_id,
        editor_id,
        notification_type,
        timestamp: Utc::now(),
        recipients,
    });
    id
}

/// Remove a profile from every recipient set it appears in.
///
/// Notifications left with no recipients are deleted; the rest are kept.
/// Returns the number of notifications the profile was detached from.
pub fn detach_profile(tables: &mut Tables, profile_id: u64) -> usize {
    let detached = tables.remove_recipient(profile_id).len();
    let orphaned = tables.delete_notifications_where(|n| n.recipients.is_empty());

    tracing::debug!(profile_id, detached, orphaned, "Detached profile from notifications");
    detached
}

/// Page through a profile's notifications, newest first.
pub fn sorted_for_profile(
    tables: &Tables,
    profile_id: u64,
    count: usize,
    start_index: usize,
) -> Result<Vec<Notification>> {
    if tables.profile(profile_id).is_none() {
        return Err(AppError::profile_not_found(profile_id));
    }

    let mut notifications = tables.notifications_for_recipient(profile_id);
    // Equal timestamps fall back to insertion order via the id.
    notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

    Ok(notifications
        .into_iter()
        .skip(start_index)
        .take(count)
        .cloned()
        .collect())
}

/// Notification operations exposed to the API layer.
#[derive(Clone)]
pub struct NotificationService {
    db: MemoryDb,
}

impl NotificationService {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Record a notification for the activity's current members.
    pub fn create_notification(
        &self,
        notification_type: NotificationType,
        activity_id: u64,
        editor: &Profile,
        message: &str,
    ) -> Result<u64> {
        self.db.transaction(|t| {
            Ok(fan_out(
                t,
                notification_type,
                activity_id,
                editor.id,
                message.to_string(),
            ))
        })
    }

    /// Up to `count` notifications for the profile, newest first, skipping the
    /// first `start_index`. Paging past the end yields an empty list.
    pub fn get_sorted_notifications(
        &self,
        profile_id: u64,
        count: usize,
        start_index: usize,
    ) -> Result<Vec<Notification>> {
        self.db
            .read(|t| sorted_for_profile(t, profile_id, count, start_index))
    }

    /// Drop the profile from every notification's recipients.
    pub fn detach_profile_from_notifications(&self, profile: &Profile) -> Result<usize> {
        self.db.transaction(|t| Ok(detach_profile(t, profile.id)))
    }
}
