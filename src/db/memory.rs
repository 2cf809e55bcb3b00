// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process entity arena with transactional writes.
//!
//! Provides typed operations for:
//! - Profiles (with their email addresses)
//! - Activities and the reference activity types
//! - Activity memberships (profile, activity, role)
//! - Activity participations
//! - Notifications and their recipient sets
//!
//! Relations are id references; nothing holds a pointer to another entity.

use crate::error::AppError;
use crate::models::{
    Activity, ActivityMembership, ActivityParticipation, ActivityType, Notification,
    PrivacyLevel, Profile, Role,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

/// Prior state of one row, written before the row changes.
#[derive(Debug)]
enum Undo {
    NextId(u64),
    Profile(u64, Option<Profile>),
    Activity(u64, Option<Activity>),
    ActivityType(u64, Option<ActivityType>),
    Membership(u64, Option<ActivityMembership>),
    Participation(u64, Option<ActivityParticipation>),
    Notification(u64, Option<Notification>),
}

fn restore<T>(table: &mut BTreeMap<u64, T>, id: u64, row: Option<T>) {
    match row {
        Some(row) => {
            table.insert(id, row);
        }
        None => {
            table.remove(&id);
        }
    }
}

/// All tables, keyed by id.
#[derive(Debug, Default)]
pub struct Tables {
    /// Undo entries of the running transaction, if any
    journal: Option<Vec<Undo>>,
    next_id: u64,
    profiles: BTreeMap<u64, Profile>,
    activities: BTreeMap<u64, Activity>,
    activity_types: BTreeMap<u64, ActivityType>,
    memberships: BTreeMap<u64, ActivityMembership>,
    participations: BTreeMap<u64, ActivityParticipation>,
    notifications: BTreeMap<u64, Notification>,
}

/// Shared handle to the arena.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a read-only query against a consistent view of all tables.
    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> Result<T, AppError>) -> Result<T, AppError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| AppError::Database("Store lock poisoned".to_string()))?;
        f(&guard)
    }

    /// Run a logical operation atomically.
    ///
    /// The write lock is held for the whole closure, so concurrent operations on
    /// the same rows serialize. Every write journals the row it replaces; if the
    /// closure fails the journal is replayed backwards and the tables are left
    /// exactly as they were.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut guard = self
            .tables
            .write()
            .map_err(|_| AppError::Database("Store lock poisoned".to_string()))?;

        guard.journal = Some(Vec::new());
        let result = f(&mut guard);
        let journal = guard.journal.take().unwrap_or_default();
        if result.is_err() {
            tracing::debug!(undone = journal.len(), "Rolling back transaction");
            guard.rollback(journal);
        }
        result
    }
}

impl Tables {
    fn record(&mut self, undo: impl FnOnce(&Self) -> Undo) {
        if self.journal.is_some() {
            let entry = undo(self);
            if let Some(journal) = self.journal.as_mut() {
                journal.push(entry);
            }
        }
    }

    fn rollback(&mut self, journal: Vec<Undo>) {
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::NextId(id) => self.next_id = id,
                Undo::Profile(id, row) => restore(&mut self.profiles, id, row),
                Undo::Activity(id, row) => restore(&mut self.activities, id, row),
                Undo::ActivityType(id, row) => restore(&mut self.activity_types, id, row),
                Undo::Membership(id, row) => restore(&mut self.memberships, id, row),
                Undo::Participation(id, row) => restore(&mut self.participations, id, row),
                Undo::Notification(id, row) => restore(&mut self.notifications, id, row),
            }
        }
    }

    /// Allocate a fresh id. Ids are unique across all tables and increase
    /// monotonically, so they also order rows by insertion.
    pub fn next_id(&mut self) -> u64 {
        self.record(|t| Undo::NextId(t.next_id));
        self.next_id += 1;
        self.next_id
    }

    // ─── Profile Operations ──────────────────────────────────────

    pub fn profile(&self, profile_id: u64) -> Option<&Profile> {
        self.profiles.get(&profile_id)
    }

    pub fn profile_mut(&mut self, profile_id: u64) -> Option<&mut Profile> {
        self.record(|t| Undo::Profile(profile_id, t.profiles.get(&profile_id).cloned()));
        self.profiles.get_mut(&profile_id)
    }

    /// All profiles in id order.
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// Look up a profile by any of its email addresses (case-insensitive).
    pub fn profile_by_email(&self, address: &str) -> Option<&Profile> {
        self.profiles.values().find(|p| p.has_email(address))
    }

    /// Whether the profile exists and holds an admin auth level.
    pub fn is_admin(&self, profile_id: u64) -> bool {
        self.profile(profile_id).is_some_and(Profile::is_admin)
    }

    pub fn insert_profile(&mut self, profile: Profile) {
        let id = profile.id;
        self.record(|t| Undo::Profile(id, t.profiles.get(&id).cloned()));
        self.profiles.insert(id, profile);
    }

    pub fn remove_profile(&mut self, profile_id: u64) -> Option<Profile> {
        self.record(|t| Undo::Profile(profile_id, t.profiles.get(&profile_id).cloned()));
        self.profiles.remove(&profile_id)
    }

    // ─── Activity Operations ─────────────────────────────────────

    pub fn activity(&self, activity_id: u64) -> Option<&Activity> {
        self.activities.get(&activity_id)
    }

    pub fn activity_mut(&mut self, activity_id: u64) -> Option<&mut Activity> {
        self.record(|t| Undo::Activity(activity_id, t.activities.get(&activity_id).cloned()));
        self.activities.get_mut(&activity_id)
    }

    pub fn activity_by_name(&self, name: &str) -> Option<&Activity> {
        self.activities.values().find(|a| a.name == name)
    }

    pub fn activities_with_privacy(&self, privacy: PrivacyLevel) -> Vec<&Activity> {
        self.activities
            .values()
            .filter(|a| a.privacy == privacy)
            .collect()
    }

    pub fn save_activity(&mut self, activity: Activity) {
        let id = activity.id;
        self.record(|t| Undo::Activity(id, t.activities.get(&id).cloned()));
        self.activities.insert(id, activity);
    }

    pub fn remove_activity(&mut self, activity_id: u64) -> Option<Activity> {
        self.record(|t| Undo::Activity(activity_id, t.activities.get(&activity_id).cloned()));
        self.activities.remove(&activity_id)
    }

    // ─── Activity Type Operations ────────────────────────────────

    pub fn activity_type_by_name(&self, name: &str) -> Option<&ActivityType> {
        self.activity_types.values().find(|t| t.name == name)
    }

    /// Add a reference activity type if no type with that name exists.
    pub fn ensure_activity_type(&mut self, name: &str) -> u64 {
        if let Some(existing) = self.activity_type_by_name(name) {
            return existing.id;
        }
        let id = self.next_id();
        self.record(|_| Undo::ActivityType(id, None));
        self.activity_types.insert(
            id,
            ActivityType {
                id,
                name: name.to_string(),
                activities: BTreeSet::new(),
            },
        );
        id
    }

    /// Tag names of an activity, sorted.
    pub fn activity_type_names(&self, activity: &Activity) -> Vec<String> {
        let mut names: Vec<String> = activity
            .activity_types
            .iter()
            .filter_map(|id| self.activity_types.get(id))
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Record `activity_id` in the reverse index of a type.
    pub fn attach_activity_type(&mut self, type_id: u64, activity_id: u64) {
        self.record(|t| Undo::ActivityType(type_id, t.activity_types.get(&type_id).cloned()));
        if let Some(t) = self.activity_types.get_mut(&type_id) {
            t.activities.insert(activity_id);
        }
    }

    pub fn detach_activity_type(&mut self, type_id: u64, activity_id: u64) {
        self.record(|t| Undo::ActivityType(type_id, t.activity_types.get(&type_id).cloned()));
        if let Some(t) = self.activity_types.get_mut(&type_id) {
            t.activities.remove(&activity_id);
        }
    }

    /// Activity ids tagged with the given type.
    pub fn activities_with_type(&self, type_id: u64) -> BTreeSet<u64> {
        self.activity_types
            .get(&type_id)
            .map(|t| t.activities.clone())
            .unwrap_or_default()
    }

    // ─── Membership Operations ───────────────────────────────────

    pub fn membership(&self, profile_id: u64, activity_id: u64) -> Option<&ActivityMembership> {
        self.memberships
            .values()
            .find(|m| m.profile_id == profile_id && m.activity_id == activity_id)
    }

    /// Role the profile holds in the activity, if any.
    pub fn role_of(&self, profile_id: u64, activity_id: u64) -> Option<Role> {
        self.membership(profile_id, activity_id).map(|m| m.role)
    }

    pub fn memberships_for_activity(&self, activity_id: u64) -> Vec<&ActivityMembership> {
        self.memberships
            .values()
            .filter(|m| m.activity_id == activity_id)
            .collect()
    }

    pub fn memberships_with_role(&self, activity_id: u64, role: Role) -> Vec<&ActivityMembership> {
        self.memberships
            .values()
            .filter(|m| m.activity_id == activity_id && m.role == role)
            .collect()
    }

    pub fn memberships_for_profile(&self, profile_id: u64) -> Vec<&ActivityMembership> {
        self.memberships
            .values()
            .filter(|m| m.profile_id == profile_id)
            .collect()
    }

    /// Profile ids of every current member of an activity.
    pub fn member_ids(&self, activity_id: u64) -> BTreeSet<u64> {
        self.memberships
            .values()
            .filter(|m| m.activity_id == activity_id)
            .map(|m| m.profile_id)
            .collect()
    }

    pub fn save_membership(&mut self, membership: ActivityMembership) {
        let id = membership.id;
        self.record(|t| Undo::Membership(id, t.memberships.get(&id).cloned()));
        self.memberships.insert(id, membership);
    }

    pub fn delete_membership(&mut self, membership_id: u64) -> Option<ActivityMembership> {
        self.record(|t| {
            Undo::Membership(membership_id, t.memberships.get(&membership_id).cloned())
        });
        self.memberships.remove(&membership_id)
    }

    // ─── Participation Operations ────────────────────────────────

    pub fn participation(&self, participation_id: u64) -> Option<&ActivityParticipation> {
        self.participations.get(&participation_id)
    }

    pub fn participations_for_activity(&self, activity_id: u64) -> Vec<&ActivityParticipation> {
        self.participations
            .values()
            .filter(|p| p.activity_id == activity_id)
            .collect()
    }

    pub fn save_participation(&mut self, participation: ActivityParticipation) {
        let id = participation.id;
        self.record(|t| Undo::Participation(id, t.participations.get(&id).cloned()));
        self.participations.insert(id, participation);
    }

    pub fn delete_participation(&mut self, participation_id: u64) -> Option<ActivityParticipation> {
        let removed = self.participations.remove(&participation_id);
        if let Some(row) = &removed {
            let row = row.clone();
            self.record(|_| Undo::Participation(participation_id, Some(row)));
        }
        removed
    }

    /// Delete every participation matching the predicate, returning how many went.
    pub fn delete_participations_where(
        &mut self,
        pred: impl Fn(&ActivityParticipation) -> bool,
    ) -> usize {
        let ids: Vec<u64> = self
            .participations
            .values()
            .filter(|p| pred(p))
            .map(|p| p.id)
            .collect();
        for id in &ids {
            self.delete_participation(*id);
        }
        ids.len()
    }

    // ─── Notification Operations ─────────────────────────────────

    pub fn insert_notification(&mut self, notification: Notification) {
        let id = notification.id;
        self.record(|t| Undo::Notification(id, t.notifications.get(&id).cloned()));
        self.notifications.insert(id, notification);
    }

    pub fn notification(&self, notification_id: u64) -> Option<&Notification> {
        self.notifications.get(&notification_id)
    }

    /// Notifications whose recipient set contains the profile, in id order.
    pub fn notifications_for_recipient(&self, profile_id: u64) -> Vec<&Notification> {
        self.notifications
            .values()
            .filter(|n| n.recipients.contains(&profile_id))
            .collect()
    }

    /// Take the profile out of every recipient set that holds it. Returns
    /// the ids of the notifications it was removed from.
    pub fn remove_recipient(&mut self, profile_id: u64) -> Vec<u64> {
        let ids: Vec<u64> = self
            .notifications
            .values()
            .filter(|n| n.recipients.contains(&profile_id))
            .map(|n| n.id)
            .collect();
        for id in &ids {
            self.record(|t| Undo::Notification(*id, t.notifications.get(id).cloned()));
            if let Some(n) = self.notifications.get_mut(id) {
                n.recipients.remove(&profile_id);
            }
        }
        ids
    }

    /// Delete every notification matching the predicate, returning how many went.
    pub fn delete_notifications_where(&mut self, pred: impl Fn(&Notification) -> bool) -> usize {
        let ids: Vec<u64> = self
            .notifications
            .values()
            .filter(|n| pred(n))
            .map(|n| n.id)
            .collect();
        for id in &ids {
            if let Some(row) = self.notifications.remove(id) {
                self.record(|_| Undo::Notification(*id, Some(row)));
            }
        }
        ids.len()
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationType;
    use chrono::Utc;

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut t = Tables::default();
        let a = t.next_id();
        let b = t.next_id();
        assert!(b > a);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let db = MemoryDb::new();
        let result: Result<(), AppError> = db.transaction(|t| {
            t.ensure_activity_type("Hiking");
            Err(AppError::BadRequest("abort".to_string()))
        });
        assert!(result.is_err());

        let found = db
            .read(|t| Ok(t.activity_type_by_name("Hiking").is_some()))
            .unwrap();
        assert!(!found);
    }

    #[test]
    fn test_rollback_restores_updated_and_deleted_rows() {
        let db = MemoryDb::new();
        let type_id = db.transaction(|t| Ok(t.ensure_activity_type("Hiking"))).unwrap();
        let (shared, solo) = db
            .transaction(|t| {
                let mut ids = Vec::new();
                for recipients in [BTreeSet::from([1, 2]), BTreeSet::from([1])] {
                    let id = t.next_id();
                    t.insert_notification(Notification {
                        id,
                        message: "Hike edited".to_string(),
                        activity_id: 7,
                        editor_id: 2,
                        notification_type: NotificationType::ActivityEdited,
                        timestamp: Utc::now(),
                        recipients,
                    });
                    ids.push(id);
                }
                Ok((ids[0], ids[1]))
            })
            .unwrap();
        let before = db.read(|t| Ok(t.next_id)).unwrap();

        let result: Result<(), AppError> = db.transaction(|t| {
            let activity_id = t.next_id();
            t.attach_activity_type(type_id, activity_id);
            t.ensure_activity_type("Running");
            t.remove_recipient(1);
            t.delete_notifications_where(|n| n.recipients.is_empty());
            Err(AppError::BadRequest("abort".to_string()))
        });
        assert!(result.is_err());

        db.read(|t| {
            assert_eq!(t.next_id, before);
            assert!(t.activities_with_type(type_id).is_empty());
            assert!(t.activity_type_by_name("Running").is_none());
            assert_eq!(t.notification(shared).unwrap().recipients, BTreeSet::from([1, 2]));
            assert_eq!(t.notification(solo).unwrap().recipients, BTreeSet::from([1]));
            assert!(t.journal.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_successful_transaction_commits() {
        let db = MemoryDb::new();
        let id = db.transaction(|t| Ok(t.ensure_activity_type("Hiking"))).unwrap();
        let again = db.transaction(|t| Ok(t.ensure_activity_type("Hiking"))).unwrap();
        assert_eq!(id, again);
    }
}
