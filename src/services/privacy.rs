// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity privacy changes.
//!
//! Moving an activity to FRIENDS may carry a share list that adds or re-roles
//! members in the same step. Every successful change notifies the members.

use crate::db::MemoryDb;
use crate::error::{AppError, Result, ValidationError};
use crate::models::{NotificationType, PrivacyLevel, Role};
use crate::services::membership::{add_member, can_manage, set_role};
use crate::services::notifications::fan_out;
use serde::Deserialize;

/// One entry of a FRIENDS share list.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberShare {
    pub email: String,
    pub role: String,
}

#[derive(Clone)]
pub struct PrivacyService {
    db: MemoryDb,
}

impl PrivacyService {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Set the privacy level of an activity.
    ///
    /// `requested` is one of "private", "friends" or "public" in any case. The
    /// share list only applies when moving to FRIENDS. The whole change,
    /// membership updates included, is applied atomically.
    pub fn edit_activity_privacy(
        &self,
        requested: &str,
        activity_id: u64,
        editor_id: u64,
        share: Option<&[MemberShare]>,
    ) -> Result<PrivacyLevel> {
        let level: PrivacyLevel = requested.parse()?;

        self.db.transaction(|t| {
            let name = t
                .activity(activity_id)
                .map(|a| a.name.clone())
                .ok_or_else(|| AppError::activity_not_found(activity_id))?;
            if t.profile(editor_id).is_none() {
                return Err(AppError::profile_not_found(editor_id));
            }
            if !can_manage(t, editor_id, activity_id) {
                return Err(AppError::Forbidden(format!(
                    "Profile {} may not change the privacy of activity {}",
                    editor_id, activity_id
                )));
            }

            if let Some(activity) = t.activity_mut(activity_id) {
                activity.privacy = level;
            }

            match share {
                Some(entries) if level == PrivacyLevel::Friends => {
                    let mut resolved = Vec::with_capacity(entries.len());
                    let mut unknown = Vec::new();
                    for entry in entries {
                        let role: Role = entry.role.parse()?;
                        match t.profile_by_email(&entry.email) {
                            Some(profile) => resolved.push((profile.id, role)),
                            None => unknown.push(entry.email.clone()),
                        }
                    }
                    if !unknown.is_empty() {
                        return Err(ValidationError::UnknownEmails(unknown).into());
                    }

                    for (profile_id, role) in resolved {
                        if role.is_creator() {
                            return Err(AppError::InvalidTransition(
                                "Profiles cannot be shared as the creator".to_string(),
                            ));
                        }
                        if t.membership(profile_id, activity_id).is_some() {
                            set_role(t, profile_id, editor_id, activity_id, role)?;
                        } else {
                            add_member(t, profile_id, activity_id, role);
                        }
                    }
                }
                Some(entries) => {
                    tracing::debug!(
                        activity_id,
                        %level,
                        entries = entries.len(),
                        "Ignoring share list for non-friends privacy level"
                    );
                }
                None => {}
            }

            fan_out(
                t,
                NotificationType::ActivityPrivacyChanged,
                activity_id,
                editor_id,
                format!("Activity {}'s privacy level has been changed to {}", name, level),
            );

            tracing::info!(activity_id, editor_id, %level, "Activity privacy changed");
            Ok(level)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{seed_activity, seed_member, seed_profile};

    fn setup() -> (MemoryDb, PrivacyService, u64, u64, u64) {
        let db = MemoryDb::new();
        let (creator, follower, activity) = db
            .transaction(|t| {
                let creator = seed_profile(t, "creator@example.com");
                let follower = seed_profile(t, "follower@example.com");
                let activity = seed_activity(t, "Kaikoura Coast Track race");
                seed_member(t, creator, activity, Role::Creator);
                seed_member(t, follower, activity, Role::Follower);
                Ok((creator, follower, activity))
            })
            .unwrap();
        (db.clone(), PrivacyService::new(db), creator, follower, activity)
    }

    fn privacy_of(db: &MemoryDb, activity: u64) -> u8 {
        db.read(|t| Ok(t.activity(activity).unwrap().privacy.level()))
            .unwrap()
    }

    #[test]
    fn test_levels_set_numeric_privacy() {
        let (db, service, creator, _, activity) = setup();
        for (requested, expected) in [("public", 2), ("friends", 1), ("private", 0)] {
            service
                .edit_activity_privacy(requested, activity, creator, None)
                .unwrap();
            assert_eq!(privacy_of(&db, activity), expected);
        }
    }

    #[test]
    fn test_unknown_level_leaves_privacy_unchanged() {
        let (db, service, creator, _, activity) = setup();
        let err = service
            .edit_activity_privacy("everyone", activity, creator, None)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidPrivacyLevel(_)));
        assert_eq!(privacy_of(&db, activity), 2);
        assert_eq!(db.read(|t| Ok(t.notification_count())).unwrap(), 0);
    }

    #[test]
    fn test_change_notifies_all_members() {
        let (db, service, creator, follower, activity) = setup();
        service
            .edit_activity_privacy("Public", activity, creator, None)
            .unwrap();

        let notifications = db
            .read(|t| {
                Ok(t.notifications_for_recipient(follower)
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>())
            })
            .unwrap();
        assert_eq!(notifications.len(), 1);
        let n = &notifications[0];
        assert_eq!(n.notification_type, NotificationType::ActivityPrivacyChanged);
        assert_eq!(
            n.message,
            "Activity Kaikoura Coast Track race's privacy level has been changed to public"
        );
        assert!(n.recipients.contains(&creator));
    }

    #[test]
    fn test_missing_activity_is_not_found() {
        let (_, service, creator, _, _) = setup();
        let err = service
            .edit_activity_privacy("public", 9999, creator, None)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_non_creator_is_forbidden() {
        let (_, service, _, follower, activity) = setup();
        let err = service
            .edit_activity_privacy("public", activity, follower, None)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_friends_share_list_adds_and_rerolls_members() {
        let (db, service, creator, follower, activity) = setup();
        let friend = db
            .transaction(|t| Ok(seed_profile(t, "friend@example.com")))
            .unwrap();
        let share = vec![
            MemberShare {
                email: "friend@example.com".to_string(),
                role: "participant".to_string(),
            },
            MemberShare {
                email: "follower@example.com".to_string(),
                role: "organiser".to_string(),
            },
        ];
        service
            .edit_activity_privacy("friends", activity, creator, Some(&share))
            .unwrap();

        db.read(|t| {
            assert_eq!(t.role_of(friend, activity), Some(Role::Participant));
            assert_eq!(t.role_of(follower, activity), Some(Role::Organiser));
            assert_eq!(t.memberships_with_role(activity, Role::Creator).len(), 1);
            // The new member is part of the recipient snapshot.
            let n = t.notifications_for_recipient(friend);
            assert_eq!(n.len(), 1);
            assert_eq!(n[0].recipients.len(), 3);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_share_targeting_creator_rolls_back() {
        let (db, service, creator, follower, activity) = setup();
        let share = vec![
            MemberShare {
                email: "follower@example.com".to_string(),
                role: "participant".to_string(),
            },
            MemberShare {
                email: "creator@example.com".to_string(),
                role: "follower".to_string(),
            },
        ];
        let err = service
            .edit_activity_privacy("friends", activity, creator, Some(&share))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition(_)));

        db.read(|t| {
            assert_eq!(t.role_of(follower, activity), Some(Role::Follower));
            assert_eq!(t.role_of(creator, activity), Some(Role::Creator));
            assert_eq!(t.activity(activity).unwrap().privacy, PrivacyLevel::Public);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_share_with_unknown_email_fails_validation() {
        let (_, service, creator, _, activity) = setup();
        let share = vec![MemberShare {
            email: "nobody@example.com".to_string(),
            role: "follower".to_string(),
        }];
        let err = service
            .edit_activity_privacy("friends", activity, creator, Some(&share))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::UnknownEmails(ref emails))
                if emails == &["nobody@example.com".to_string()]
        ));
    }
}
