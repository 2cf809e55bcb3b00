// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity membership and role transitions.
//!
//! Rules enforced here:
//! 1. Every activity has exactly one CREATOR membership, set at creation
//! 2. No operation may assign CREATOR or change/remove the CREATOR membership
//! 3. Only the activity's CREATOR or an admin may change another profile's role

use crate::db::{MemoryDb, Tables};
use crate::error::{AppError, Result};
use crate::models::{ActivityMembership, NotificationType, PrivacyLevel, Profile, Role};
use crate::services::notifications::fan_out;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const EDITING_CREATOR: &str = "Profiles cannot be set to or from the creator role";
const INVALID_PERMISSION: &str = "You don't have permission to change this role";

/// Per-role member counts, creator excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoleCounts {
    pub organisers: u32,
    pub participants: u32,
    pub followers: u32,
}

/// Whether `actor_id` may manage memberships of the activity.
pub fn can_manage(tables: &Tables, actor_id: u64, activity_id: u64) -> bool {
    tables.is_admin(actor_id) || tables.role_of(actor_id, activity_id) == Some(Role::Creator)
}

/// Overwrite the role of an existing, non-creator membership.
pub fn set_role(
    tables: &mut Tables,
    target_id: u64,
    actor_id: u64,
    activity_id: u64,
    desired: Role,
) -> Result<()> {
    if desired.is_creator() {
        return Err(AppError::InvalidTransition(EDITING_CREATOR.to_string()));
    }
    if tables.activity(activity_id).is_none() {
        return Err(AppError::activity_not_found(activity_id));
    }

    let membership = tables
        .membership(target_id, activity_id)
        .cloned()
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Profile {} is not a member of activity {}",
                target_id, activity_id
            ))
        })?;

    if membership.role.is_creator() {
        return Err(AppError::InvalidTransition(EDITING_CREATOR.to_string()));
    }
    if !can_manage(tables, actor_id, activity_id) {
        tracing::debug!(
            actor_id,
            target_id,
            activity_id,
            role = %desired,
            "Role change rejected: insufficient permission"
        );
        return Err(AppError::InvalidTransition(INVALID_PERMISSION.to_string()));
    }

    tracing::info!(
        actor_id,
        target_id,
        activity_id,
        from = %membership.role,
        to = %desired,
        "Role changed"
    );

    tables.save_membership(ActivityMembership {
        role: desired,
        ..membership
    });
    Ok(())
}

/// Insert a new membership row.
pub fn add_member(tables: &mut Tables, profile_id: u64, activity_id: u64, role: Role) -> u64 {
    let id = tables.next_id();
    tables.save_membership(ActivityMembership {
        id,
        profile_id,
        activity_id,
        role,
        joined_at: Utc::now(),
    });
    id
}

/// Delete every membership of an activity.
pub fn remove_all_members(tables: &mut Tables, activity_id: u64) -> usize {
    let ids: Vec<u64> = tables
        .memberships_for_activity(activity_id)
        .iter()
        .map(|m| m.id)
        .collect();
    for id in &ids {
        tables.delete_membership(*id);
    }
    ids.len()
}

/// Membership and role operations exposed to the API layer.
#[derive(Clone)]
pub struct MembershipService {
    db: MemoryDb,
}

impl MembershipService {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Change the role `target_id` holds in the activity.
    ///
    /// Fails with `InvalidTransition` when asked for CREATOR, when the target is
    /// the CREATOR, or when the actor is neither the CREATOR nor an admin.
    pub fn set_profile_role(
        &self,
        target_id: u64,
        actor_id: u64,
        activity_id: u64,
        desired: Role,
    ) -> Result<()> {
        self.db
            .transaction(|t| set_role(t, target_id, actor_id, activity_id, desired))
    }

    /// Add `target_id` to the activity with the given role.
    ///
    /// Profiles may join public activities themselves as participant or
    /// follower; anything else needs the CREATOR or an admin.
    pub fn add_activity_role(
        &self,
        activity_id: u64,
        actor_id: u64,
        target_id: u64,
        role: Role,
    ) -> Result<u64> {
        self.db.transaction(|t| {
            if role.is_creator() {
                return Err(AppError::InvalidTransition(EDITING_CREATOR.to_string()));
            }
            let activity = t
                .activity(activity_id)
                .cloned()
                .ok_or_else(|| AppError::activity_not_found(activity_id))?;
            let target = t
                .profile(target_id)
                .cloned()
                .ok_or_else(|| AppError::profile_not_found(target_id))?;

            let self_join = actor_id == target_id
                && activity.privacy == PrivacyLevel::Public
                && role.is_self_assignable();
            if !self_join && !can_manage(t, actor_id, activity_id) {
                return Err(AppError::Forbidden(format!(
                    "Profile {} may not add members to activity {}",
                    actor_id, activity_id
                )));
            }
            if t.membership(target_id, activity_id).is_some() {
                return Err(AppError::Conflict(format!(
                    "Profile {} is already a member of activity {}",
                    target_id, activity_id
                )));
            }

            let membership_id = add_member(t, target_id, activity_id, role);
            tracing::info!(actor_id, target_id, activity_id, %role, "Member added");

            if role == Role::Follower {
                fan_out(
                    t,
                    NotificationType::ActivityFollowerAdded,
                    activity_id,
                    actor_id,
                    format!(
                        "{} {} is now following {}",
                        target.firstname, target.lastname, activity.name
                    ),
                );
            }
            Ok(membership_id)
        })
    }

    /// Remove a profile from an activity. Members may leave; the CREATOR or an
    /// admin may remove anyone except the CREATOR.
    pub fn remove_membership(&self, actor_id: u64, target_id: u64, activity_id: u64) -> Result<()> {
        self.db.transaction(|t| {
            let activity = t
                .activity(activity_id)
                .cloned()
                .ok_or_else(|| AppError::activity_not_found(activity_id))?;
            let membership = t.membership(target_id, activity_id).cloned().ok_or_else(|| {
                AppError::NotFound(format!(
                    "Profile {} is not a member of activity {}",
                    target_id, activity_id
                ))
            })?;

            if membership.role.is_creator() {
                return Err(AppError::InvalidTransition(
                    "The creator cannot be removed from an activity".to_string(),
                ));
            }
            let leaving = actor_id == target_id;
            if !leaving && !can_manage(t, actor_id, activity_id) {
                return Err(AppError::Forbidden(format!(
                    "Profile {} may not remove members from activity {}",
                    actor_id, activity_id
                )));
            }

            t.delete_membership(membership.id);
            t.delete_participations_where(|p| {
                p.profile_id == target_id && p.activity_id == activity_id
            });
            tracing::info!(actor_id, target_id, activity_id, leaving, "Membership removed");

            if !leaving {
                fan_out(
                    t,
                    NotificationType::ActivityMemberRemoved,
                    activity_id,
                    actor_id,
                    format!("A member was removed from {}", activity.name),
                );
            }
            Ok(())
        })
    }

    /// Remove every member holding `role`. Returns how many were removed.
    pub fn clear_role(&self, actor_id: u64, activity_id: u64, role: Role) -> Result<usize> {
        self.db.transaction(|t| {
            if t.activity(activity_id).is_none() {
                return Err(AppError::activity_not_found(activity_id));
            }
            if role.is_creator() {
                return Err(AppError::InvalidTransition(EDITING_CREATOR.to_string()));
            }
            if !can_manage(t, actor_id, activity_id) {
                return Err(AppError::Forbidden(format!(
                    "Profile {} may not clear roles of activity {}",
                    actor_id, activity_id
                )));
            }

            let removed: Vec<(u64, u64)> = t
                .memberships_with_role(activity_id, role)
                .iter()
                .map(|m| (m.id, m.profile_id))
                .collect();
            if removed.is_empty() {
                return Err(AppError::NotFound(format!(
                    "Activity {} has no {}s",
                    activity_id, role
                )));
            }
            for (membership_id, _) in &removed {
                t.delete_membership(*membership_id);
            }
            let profiles: BTreeSet<u64> = removed.iter().map(|(_, p)| *p).collect();
            let participations = t.delete_participations_where(|p| {
                p.activity_id == activity_id && profiles.contains(&p.profile_id)
            });

            tracing::info!(
                actor_id,
                activity_id,
                %role,
                removed = removed.len(),
                participations,
                "Role cleared"
            );
            Ok(removed.len())
        })
    }

    pub fn get_profile_role(&self, profile_id: u64, activity_id: u64) -> Result<Role> {
        self.db.read(|t| {
            t.role_of(profile_id, activity_id).ok_or_else(|| {
                AppError::NotFound(format!(
                    "Profile {} is not a member of activity {}",
                    profile_id, activity_id
                ))
            })
        })
    }

    /// Count organisers, participants and followers.
    ///
    /// An activity with no memberships at all is reported as not found.
    pub fn get_role_counts(&self, activity_id: u64) -> Result<RoleCounts> {
        self.db.read(|t| {
            if t.activity(activity_id).is_none() {
                return Err(AppError::activity_not_found(activity_id));
            }
            let members = t.memberships_for_activity(activity_id);
            if members.is_empty() {
                return Err(AppError::NotFound(format!(
                    "Activity {} has no members",
                    activity_id
                )));
            }

            let count = |role: Role| members.iter().filter(|m| m.role == role).count() as u32;
            Ok(RoleCounts {
                organisers: count(Role::Organiser),
                participants: count(Role::Participant),
                followers: count(Role::Follower),
            })
        })
    }

    /// Profiles holding `role` in the activity, in join order.
    pub fn get_members(
        &self,
        activity_id: u64,
        role: Role,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Profile>> {
        self.db.read(|t| {
            if t.activity(activity_id).is_none() {
                return Err(AppError::activity_not_found(activity_id));
            }
            Ok(t.memberships_with_role(activity_id, role)
                .into_iter()
                .filter_map(|m| t.profile(m.profile_id).cloned())
                .skip(offset)
                .take(limit)
                .collect())
        })
    }
}
