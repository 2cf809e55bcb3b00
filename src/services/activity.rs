// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity lifecycle service.
//!
//! Handles the core workflow:
//! 1. Validate the draft (name, time window, activity types)
//! 2. Store the activity and keep the type reverse index in step
//! 3. Maintain the CREATOR membership
//! 4. Notify members of every change

use crate::db::{MemoryDb, Tables};
use crate::error::{AppError, Result, ValidationError};
use crate::models::{
    api_timestamp, Activity, ActivityDraft, NotificationType, PrivacyLevel, Role,
};
use crate::services::membership::{add_member, can_manage, remove_all_members};
use crate::services::notifications::fan_out;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Activity as returned to clients, with tag names resolved.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityView {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub name: String,
    pub description: String,
    pub continuous: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub activity_types: Vec<String>,
    pub privacy: String,
    pub privacy_level: u8,
    pub created_at: String,
}

impl ActivityView {
    fn from_activity(tables: &Tables, activity: &Activity) -> Self {
        Self {
            id: activity.id,
            name: activity.name.clone(),
            description: activity.description.clone(),
            continuous: activity.continuous,
            start_time: activity.start_time.map(api_timestamp),
            end_time: activity.end_time.map(api_timestamp),
            location: activity.location.clone(),
            activity_types: tables.activity_type_names(activity),
            privacy: activity.privacy.to_string(),
            privacy_level: activity.privacy.level(),
            created_at: api_timestamp(activity.created_at),
        }
    }
}

/// Check a draft and resolve its activity types to ids.
///
/// Rules are checked in a fixed order and the first failure is reported.
fn validate_draft(tables: &Tables, draft: &ActivityDraft) -> Result<(String, BTreeSet<u64>)> {
    let name = draft
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or(ValidationError::MissingName)?;

    if !draft.continuous {
        let start = draft.start_time.ok_or(ValidationError::MissingStartDate)?;
        let end = draft.end_time.ok_or(ValidationError::MissingEndDate)?;
        if end < start {
            return Err(ValidationError::InvalidDates.into());
        }
    }

    if draft.activity_types.is_empty() {
        return Err(ValidationError::MissingTypes.into());
    }
    let mut type_ids = BTreeSet::new();
    for type_name in &draft.activity_types {
        let activity_type = tables
            .activity_type_by_name(type_name)
            .ok_or_else(|| ValidationError::InvalidType(type_name.clone()))?;
        type_ids.insert(activity_type.id);
    }

    Ok((name.to_string(), type_ids))
}

/// Reject a name already used by a different activity.
fn ensure_unique_name(tables: &Tables, name: &str, own_id: Option<u64>) -> Result<()> {
    match tables.activity_by_name(name) {
        Some(existing) if Some(existing.id) != own_id => Err(AppError::Conflict(format!(
            "An activity named '{}' already exists",
            name
        ))),
        _ => Ok(()),
    }
}

/// Delete an activity and everything that hangs off it.
///
/// Memberships go first, then the type associations, participations and
/// notifications, and finally the activity row itself.
pub fn delete_activity_cascade(tables: &mut Tables, activity_id: u64) -> Result<()> {
    let activity = tables
        .activity(activity_id)
        .cloned()
        .ok_or_else(|| AppError::activity_not_found(activity_id))?;

    let memberships = remove_all_members(tables, activity_id);
    for type_id in &activity.activity_types {
        tables.detach_activity_type(*type_id, activity_id);
    }
    let participations = tables.delete_participations_where(|p| p.activity_id == activity_id);
    let notifications = tables.delete_notifications_where(|n| n.activity_id == activity_id);
    tables.remove_activity(activity_id);

    tracing::info!(
        activity_id,
        memberships,
        participations,
        notifications,
        "Activity deleted"
    );
    Ok(())
}

/// Whether `viewer_id` may see the activity: it is not private, or the viewer
/// is a member or an admin.
pub fn can_view(tables: &Tables, viewer_id: u64, activity: &Activity) -> bool {
    activity.privacy != PrivacyLevel::Private
        || tables.membership(viewer_id, activity.id).is_some()
        || tables.is_admin(viewer_id)
}

/// Look up an activity the viewer is allowed to see.
pub fn visible_activity<'a>(
    tables: &'a Tables,
    viewer_id: u64,
    activity_id: u64,
) -> Result<&'a Activity> {
    let activity = tables
        .activity(activity_id)
        .ok_or_else(|| AppError::activity_not_found(activity_id))?;
    if !can_view(tables, viewer_id, activity) {
        return Err(AppError::Forbidden(format!(
            "Activity {} is private",
            activity_id
        )));
    }
    Ok(activity)
}

/// Activity create/update/delete and queries exposed to the API layer.
#[derive(Clone)]
pub struct ActivityService {
    db: MemoryDb,
}

impl ActivityService {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Create an activity owned by `creator_id`.
    ///
    /// The creator becomes the activity's only CREATOR member and is the
    /// sole recipient of the creation notification.
    pub fn create(&self, draft: &ActivityDraft, creator_id: u64) -> Result<u64> {
        self.db.transaction(|t| {
            let (name, type_ids) = validate_draft(t, draft)?;
            if t.profile(creator_id).is_none() {
                return Err(AppError::profile_not_found(creator_id));
            }
            ensure_unique_name(t, &name, None)?;

            let (start_time, end_time) = draft.time_window();
            let id = t.next_id();
            t.save_activity(Activity {
                id,
                name: name.clone(),
                description: draft.description.clone().unwrap_or_default(),
                continuous: draft.continuous,
                start_time,
                end_time,
                location: draft.location.clone(),
                activity_types: type_ids.clone(),
                privacy: draft.privacy.unwrap_or_default(),
                created_at: Utc::now(),
            });
            for type_id in &type_ids {
                t.attach_activity_type(*type_id, id);
            }
            add_member(t, creator_id, id, Role::Creator);

            fan_out(
                t,
                NotificationType::ActivityCreated,
                id,
                creator_id,
                format!("Activity {} was created", name),
            );

            tracing::info!(activity_id = id, creator_id, name = %name, "Activity created");
            Ok(id)
        })
    }

    /// Replace the editable fields of an activity.
    ///
    /// Privacy is left alone; it only changes through the privacy service.
    /// Tags are updated as a set difference against the stored ones.
    pub fn update(&self, draft: &ActivityDraft, activity_id: u64, editor_id: u64) -> Result<()> {
        self.db.transaction(|t| {
            let (name, type_ids) = validate_draft(t, draft)?;
            let existing = t
                .activity(activity_id)
                .cloned()
                .ok_or_else(|| AppError::activity_not_found(activity_id))?;
            if t.profile(editor_id).is_none() {
                return Err(AppError::profile_not_found(editor_id));
            }
            let may_edit = can_manage(t, editor_id, activity_id)
                || t.role_of(editor_id, activity_id) == Some(Role::Organiser);
            if !may_edit {
                return Err(AppError::Forbidden(format!(
                    "Profile {} may not edit activity {}",
                    editor_id, activity_id
                )));
            }
            ensure_unique_name(t, &name, Some(activity_id))?;

            for removed in existing.activity_types.difference(&type_ids) {
                t.detach_activity_type(*removed, activity_id);
            }
            for added in type_ids.difference(&existing.activity_types) {
                t.attach_activity_type(*added, activity_id);
            }

            let (start_time, end_time) = draft.time_window();
            t.save_activity(Activity {
                name: name.clone(),
                description: draft.description.clone().unwrap_or_default(),
                continuous: draft.continuous,
                start_time,
                end_time,
                location: draft.location.clone(),
                activity_types: type_ids,
                ..existing
            });

            fan_out(
                t,
                NotificationType::ActivityEdited,
                activity_id,
                editor_id,
                format!("Activity {} was edited", name),
            );

            tracing::info!(activity_id, editor_id, "Activity updated");
            Ok(())
        })
    }

    /// Delete an activity. Only its CREATOR or an admin may do this.
    pub fn delete(&self, activity_id: u64, requester_id: u64) -> Result<()> {
        self.db.transaction(|t| {
            if t.activity(activity_id).is_none() {
                return Err(AppError::activity_not_found(activity_id));
            }
            if !can_manage(t, requester_id, activity_id) {
                tracing::debug!(activity_id, requester_id, "Activity delete rejected");
                return Err(AppError::Forbidden(format!(
                    "Profile {} may not delete activity {}",
                    requester_id, activity_id
                )));
            }
            delete_activity_cascade(t, activity_id)
        })
    }

    /// Private activities are only readable by their members and admins.
    pub fn read(&self, activity_id: u64, viewer_id: u64) -> Result<ActivityView> {
        self.db.read(|t| {
            let activity = visible_activity(t, viewer_id, activity_id)?;
            Ok(ActivityView::from_activity(t, activity))
        })
    }

    /// Every activity at one privacy level. Only admins may list
    /// non-public levels.
    pub fn activities_with_privacy(
        &self,
        viewer_id: u64,
        privacy: PrivacyLevel,
    ) -> Result<Vec<ActivityView>> {
        self.db.read(|t| {
            if privacy != PrivacyLevel::Public && !t.is_admin(viewer_id) {
                tracing::debug!(viewer_id, %privacy, "Non-public listing rejected");
                return Err(AppError::Forbidden(
                    "Only admins may list non-public activities".to_string(),
                ));
            }
            Ok(t.activities_with_privacy(privacy)
                .into_iter()
                .map(|a| ActivityView::from_activity(t, a))
                .collect())
        })
    }

    /// Activities where the profile holds `role`, in join order.
    ///
    /// Private activities are only listed for their CREATOR.
    pub fn activities_for_profile_by_role(
        &self,
        profile_id: u64,
        role: Role,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ActivityView>> {
        self.db.read(|t| {
            if t.profile(profile_id).is_none() {
                return Err(AppError::profile_not_found(profile_id));
            }
            Ok(t.memberships_for_profile(profile_id)
                .into_iter()
                .filter(|m| m.role == role)
                .filter_map(|m| t.activity(m.activity_id))
                .filter(|a| role.is_creator() || a.privacy != PrivacyLevel::Private)
                .skip(offset)
                .take(limit)
                .map(|a| ActivityView::from_activity(t, a))
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth_level;
    use crate::services::testing::{seed_member, seed_profile, seed_profile_with_level};
    use chrono::{Duration, TimeZone};

    fn setup() -> (MemoryDb, ActivityService, u64) {
        let db = MemoryDb::new();
        let creator = db
            .transaction(|t| {
                for name in ["Hiking", "Tramping", "Running"] {
                    t.ensure_activity_type(name);
                }
                Ok(seed_profile(t, "ben@example.com"))
            })
            .unwrap();
        (db.clone(), ActivityService::new(db), creator)
    }

    fn draft(types: &[&str]) -> ActivityDraft {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        ActivityDraft {
            name: Some("Kaikoura Coast Track race".to_string()),
            description: Some("A big and nice race on a lovely peninsula".to_string()),
            continuous: false,
            start_time: Some(start),
            end_time: Some(start + Duration::hours(6)),
            location: Some("Kaikoura, NZ".to_string()),
            activity_types: types.iter().map(|s| s.to_string()).collect(),
            privacy: None,
        }
    }

    fn validation_reason(err: AppError) -> ValidationError {
        match err {
            AppError::Validation(reason) => reason,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_round_trips_tags_and_creator() {
        let (db, service, creator) = setup();
        let id = service.create(&draft(&["Tramping", "Hiking"]), creator).unwrap();

        let view = service.read(id, creator).unwrap();
        assert_eq!(view.activity_types, vec!["Hiking", "Tramping"]);
        assert_eq!(view.privacy_level, 0);

        db.read(|t| {
            assert_eq!(t.memberships_with_role(id, Role::Creator).len(), 1);
            assert_eq!(t.role_of(creator, id), Some(Role::Creator));
            let hiking = t.activity_type_by_name("Hiking").unwrap().id;
            assert!(t.activities_with_type(hiking).contains(&id));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_create_notifies_creator_only() {
        let (db, service, creator) = setup();
        let id = service.create(&draft(&["Hiking"]), creator).unwrap();
        db.read(|t| {
            let n = t.notifications_for_recipient(creator);
            assert_eq!(n.len(), 1);
            assert_eq!(n[0].notification_type, NotificationType::ActivityCreated);
            assert_eq!(n[0].recipients, t.member_ids(id));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_create_missing_end_date() {
        let (_, service, creator) = setup();
        let mut d = draft(&["Hiking"]);
        d.end_time = None;
        let err = service.create(&d, creator).unwrap_err();
        assert_eq!(validation_reason(err), ValidationError::MissingEndDate);
    }

    #[test]
    fn test_create_end_before_start() {
        let (db, service, creator) = setup();
        let mut d = draft(&["Hiking"]);
        d.end_time = d.start_time.map(|s| s - Duration::days(1));
        let err = service.create(&d, creator).unwrap_err();
        assert_eq!(validation_reason(err), ValidationError::InvalidDates);
        let gone = db
            .read(|t| Ok(t.activity_by_name("Kaikoura Coast Track race").is_none()))
            .unwrap();
        assert!(gone);
    }

    #[test]
    fn test_create_reports_first_failed_rule() {
        let (_, service, creator) = setup();
        let d = ActivityDraft {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            validation_reason(service.create(&d, creator).unwrap_err()),
            ValidationError::MissingName
        );

        let mut d = draft(&[]);
        d.start_time = None;
        assert_eq!(
            validation_reason(service.create(&d, creator).unwrap_err()),
            ValidationError::MissingStartDate
        );

        let d = draft(&[]);
        assert_eq!(
            validation_reason(service.create(&d, creator).unwrap_err()),
            ValidationError::MissingTypes
        );

        let d = draft(&["Hiking", "Underwater Basket Weaving"]);
        assert_eq!(
            validation_reason(service.create(&d, creator).unwrap_err()),
            ValidationError::InvalidType("Underwater Basket Weaving".to_string())
        );
    }

    #[test]
    fn test_continuous_activity_needs_no_dates() {
        let (_, service, creator) = setup();
        let d = ActivityDraft {
            continuous: true,
            start_time: None,
            end_time: None,
            ..draft(&["Running"])
        };
        let id = service.create(&d, creator).unwrap();
        let view = service.read(id, creator).unwrap();
        assert!(view.continuous);
        assert!(view.start_time.is_none());
    }

    #[test]
    fn test_create_unknown_creator_is_not_found() {
        let (_, service, _) = setup();
        let err = service.create(&draft(&["Hiking"]), 9999).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let (_, service, creator) = setup();
        service.create(&draft(&["Hiking"]), creator).unwrap();
        let err = service.create(&draft(&["Running"]), creator).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_update_swaps_tags_and_notifies_members() {
        let (db, service, creator) = setup();
        let id = service.create(&draft(&["Hiking", "Tramping"]), creator).unwrap();
        let follower = db
            .transaction(|t| {
                let follower = seed_profile(t, "johnny@example.com");
                seed_member(t, follower, id, Role::Follower);
                Ok(follower)
            })
            .unwrap();

        service.update(&draft(&["Tramping", "Running"]), id, creator).unwrap();

        assert_eq!(service.read(id, creator).unwrap().activity_types, vec!["Running", "Tramping"]);
        db.read(|t| {
            let hiking = t.activity_type_by_name("Hiking").unwrap().id;
            let running = t.activity_type_by_name("Running").unwrap().id;
            assert!(!t.activities_with_type(hiking).contains(&id));
            assert!(t.activities_with_type(running).contains(&id));

            let n = t.notifications_for_recipient(follower);
            assert_eq!(n.len(), 1);
            assert_eq!(n[0].notification_type, NotificationType::ActivityEdited);
            assert_eq!(n[0].recipients.len(), 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_keeps_privacy() {
        let (db, service, creator) = setup();
        let id = service.create(&draft(&["Hiking"]), creator).unwrap();
        let mut d = draft(&["Hiking"]);
        d.privacy = Some(PrivacyLevel::Public);
        service.update(&d, id, creator).unwrap();
        assert!(db
            .read(|t| Ok(t.activity(id).unwrap().privacy == PrivacyLevel::Private))
            .unwrap());
    }

    #[test]
    fn test_update_missing_activity_is_not_found() {
        let (_, service, creator) = setup();
        let err = service.update(&draft(&["Hiking"]), 9999, creator).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_update_by_follower_forbidden() {
        let (db, service, creator) = setup();
        let id = service.create(&draft(&["Hiking"]), creator).unwrap();
        let follower = db
            .transaction(|t| {
                let follower = seed_profile(t, "johnny@example.com");
                seed_member(t, follower, id, Role::Follower);
                Ok(follower)
            })
            .unwrap();
        let err = service.update(&draft(&["Running"]), id, follower).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_delete_cascades() {
        let (db, service, creator) = setup();
        let id = service.create(&draft(&["Hiking"]), creator).unwrap();
        let follower = db
            .transaction(|t| {
                let follower = seed_profile(t, "johnny@example.com");
                seed_member(t, follower, id, Role::Follower);
                Ok(follower)
            })
            .unwrap();

        service.delete(id, creator).unwrap();

        db.read(|t| {
            assert!(t.activity(id).is_none());
            assert!(t.memberships_for_activity(id).is_empty());
            assert!(t.memberships_for_profile(follower).is_empty());
            let hiking = t.activity_type_by_name("Hiking").unwrap().id;
            assert!(t.activities_with_type(hiking).is_empty());
            assert_eq!(t.notification_count(), 0);
            Ok(())
        })
        .unwrap();

        let err = service.delete(id, creator).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_delete_by_admin_allowed_and_by_stranger_forbidden() {
        let (db, service, creator) = setup();
        let id = service.create(&draft(&["Hiking"]), creator).unwrap();
        let (stranger, admin) = db
            .transaction(|t| {
                Ok((
                    seed_profile(t, "stranger@example.com"),
                    seed_profile_with_level(t, "admin@example.com", auth_level::ADMIN),
                ))
            })
            .unwrap();

        let err = service.delete(id, stranger).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        service.delete(id, admin).unwrap();
    }

    #[test]
    fn test_private_activities_hidden_unless_creator() {
        let (db, service, creator) = setup();
        let id = service.create(&draft(&["Hiking"]), creator).unwrap();
        let follower = db
            .transaction(|t| {
                let follower = seed_profile(t, "johnny@example.com");
                seed_member(t, follower, id, Role::Follower);
                Ok(follower)
            })
            .unwrap();

        assert_eq!(
            service
                .activities_for_profile_by_role(creator, Role::Creator, 0, 10)
                .unwrap()
                .len(),
            1
        );
        assert!(service
            .activities_for_profile_by_role(follower, Role::Follower, 0, 10)
            .unwrap()
            .is_empty());

        db.transaction(|t| {
            t.activity_mut(id).unwrap().privacy = PrivacyLevel::Public;
            Ok(())
        })
        .unwrap();
        assert_eq!(
            service
                .activities_for_profile_by_role(follower, Role::Follower, 0, 10)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            service
                .activities_with_privacy(follower, PrivacyLevel::Public)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_private_activity_read_limited_to_members_and_admins() {
        let (db, service, creator) = setup();
        let id = service.create(&draft(&["Hiking"]), creator).unwrap();
        let (stranger, admin) = db
            .transaction(|t| {
                Ok((
                    seed_profile(t, "stranger@example.com"),
                    seed_profile_with_level(t, "admin@example.com", auth_level::ADMIN),
                ))
            })
            .unwrap();

        assert!(matches!(
            service.read(id, stranger).unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert_eq!(service.read(id, admin).unwrap().id, id);
        assert!(matches!(
            service.read(id + 100, admin).unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn test_non_public_listing_checks_stored_level() {
        let (db, service, creator) = setup();
        service.create(&draft(&["Hiking"]), creator).unwrap();
        let admin = db
            .transaction(|t| Ok(seed_profile_with_level(t, "admin@example.com", auth_level::ADMIN)))
            .unwrap();

        assert!(matches!(
            service
                .activities_with_privacy(creator, PrivacyLevel::Private)
                .unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert_eq!(
            service
                .activities_with_privacy(admin, PrivacyLevel::Private)
                .unwrap()
                .len(),
            1
        );

        // Demoted admins lose access straight away
        db.transaction(|t| {
            t.profile_mut(admin).unwrap().auth_level = auth_level::USER;
            Ok(())
        })
        .unwrap();
        assert!(service
            .activities_with_privacy(admin, PrivacyLevel::Private)
            .is_err());
    }
}
