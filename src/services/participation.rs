// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Participation records logged by activity members.

use crate::db::MemoryDb;
use crate::error::{AppError, Result, ValidationError};
use crate::models::{ActivityParticipation, ParticipationDraft};
use crate::services::activity::visible_activity;

fn validate(draft: &ParticipationDraft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle.into());
    }
    if let (Some(start), Some(end)) = (draft.start_time, draft.end_time) {
        if end < start {
            return Err(ValidationError::InvalidDates.into());
        }
    }
    Ok(())
}

fn not_found(participation_id: u64) -> AppError {
    AppError::NotFound(format!("No participation with id {}", participation_id))
}

#[derive(Clone)]
pub struct ParticipationService {
    db: MemoryDb,
}

impl ParticipationService {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Record a participation. The profile must be a member of the activity.
    pub fn create(
        &self,
        profile_id: u64,
        activity_id: u64,
        draft: &ParticipationDraft,
    ) -> Result<u64> {
        validate(draft)?;
        self.db.transaction(|t| {
            if t.activity(activity_id).is_none() {
                return Err(AppError::activity_not_found(activity_id));
            }
            if t.membership(profile_id, activity_id).is_none() {
                return Err(AppError::Forbidden(format!(
                    "Profile {} is not a member of activity {}",
                    profile_id, activity_id
                )));
            }

            let id = t.next_id();
            t.save_participation(ActivityParticipation {
                id,
                profile_id,
                activity_id,
                title: draft.title.trim().to_string(),
                details: draft.details.clone(),
                start_time: draft.start_time,
                end_time: draft.end_time,
            });
            tracing::info!(
                participation_id = id,
                profile_id,
                activity_id,
                "Participation recorded"
            );
            Ok(id)
        })
    }

    /// Overwrite a participation. Only its owner or an admin may edit it.
    pub fn edit(
        &self,
        actor_id: u64,
        participation_id: u64,
        draft: &ParticipationDraft,
    ) -> Result<()> {
        validate(draft)?;
        self.db.transaction(|t| {
            let existing = t
                .participation(participation_id)
                .cloned()
                .ok_or_else(|| not_found(participation_id))?;
            if existing.profile_id != actor_id && !t.is_admin(actor_id) {
                return Err(AppError::Forbidden(format!(
                    "Profile {} may not edit participation {}",
                    actor_id, participation_id
                )));
            }

            t.save_participation(ActivityParticipation {
                title: draft.title.trim().to_string(),
                details: draft.details.clone(),
                start_time: draft.start_time,
                end_time: draft.end_time,
                ..existing
            });
            tracing::info!(participation_id, actor_id, "Participation edited");
            Ok(())
        })
    }

    pub fn delete(&self, actor_id: u64, participation_id: u64) -> Result<()> {
        self.db.transaction(|t| {
            let existing = t
                .participation(participation_id)
                .ok_or_else(|| not_found(participation_id))?;
            if existing.profile_id != actor_id && !t.is_admin(actor_id) {
                return Err(AppError::Forbidden(format!(
                    "Profile {} may not delete participation {}",
                    actor_id, participation_id
                )));
            }
            t.delete_participation(participation_id);
            tracing::info!(participation_id, actor_id, "Participation deleted");
            Ok(())
        })
    }

    pub fn get(&self, viewer_id: u64, participation_id: u64) -> Result<ActivityParticipation> {
        self.db.read(|t| {
            let participation = t
                .participation(participation_id)
                .ok_or_else(|| not_found(participation_id))?;
            visible_activity(t, viewer_id, participation.activity_id)?;
            Ok(participation.clone())
        })
    }

    pub fn for_activity(
        &self,
        viewer_id: u64,
        activity_id: u64,
    ) -> Result<Vec<ActivityParticipation>> {
        self.db.read(|t| {
            visible_activity(t, viewer_id, activity_id)?;
            Ok(t.participations_for_activity(activity_id)
                .into_iter()
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth_level, PrivacyLevel, Role};
    use crate::services::testing::{
        seed_activity, seed_member, seed_profile, seed_profile_with_level,
    };
    use chrono::{Duration, Utc};

    fn setup() -> (MemoryDb, ParticipationService, u64, u64) {
        let db = MemoryDb::new();
        let (member, activity) = db
            .transaction(|t| {
                let member = seed_profile(t, "johnny@example.com");
                let activity = seed_activity(t, "Kaikoura Coast Track race");
                seed_member(t, member, activity, Role::Participant);
                Ok((member, activity))
            })
            .unwrap();
        (db.clone(), ParticipationService::new(db), member, activity)
    }

    fn draft(title: &str) -> ParticipationDraft {
        ParticipationDraft {
            title: title.to_string(),
            details: "Finished in the top ten".to_string(),
            start_time: None,
            end_time: None,
        }
    }

    #[test]
    fn test_member_records_and_edits_participation() {
        let (_, service, member, activity) = setup();
        let id = service.create(member, activity, &draft("Race day")).unwrap();
        service.edit(member, id, &draft("Race day, revised")).unwrap();

        let p = service.get(member, id).unwrap();
        assert_eq!(p.title, "Race day, revised");
        assert_eq!(service.for_activity(member, activity).unwrap().len(), 1);
    }

    #[test]
    fn test_non_member_cannot_record() {
        let (db, service, _, activity) = setup();
        let stranger = db
            .transaction(|t| Ok(seed_profile(t, "stranger@example.com")))
            .unwrap();
        let err = service.create(stranger, activity, &draft("Sneaky")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn test_blank_title_and_bad_dates_rejected() {
        let (_, service, member, activity) = setup();
        assert!(matches!(
            service.create(member, activity, &draft("  ")).unwrap_err(),
            AppError::Validation(ValidationError::MissingTitle)
        ));

        let now = Utc::now();
        let d = ParticipationDraft {
            start_time: Some(now),
            end_time: Some(now - Duration::hours(1)),
            ..draft("Backwards")
        };
        assert!(matches!(
            service.create(member, activity, &d).unwrap_err(),
            AppError::Validation(ValidationError::InvalidDates)
        ));
    }

    #[test]
    fn test_private_activity_participations_hidden_from_strangers() {
        let (db, service, member, activity) = setup();
        let id = service.create(member, activity, &draft("Race day")).unwrap();
        let stranger = db
            .transaction(|t| {
                t.activity_mut(activity).unwrap().privacy = PrivacyLevel::Private;
                Ok(seed_profile(t, "stranger@example.com"))
            })
            .unwrap();

        assert!(matches!(
            service.for_activity(stranger, activity).unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            service.get(stranger, id).unwrap_err(),
            AppError::Forbidden(_)
        ));
        assert_eq!(service.for_activity(member, activity).unwrap().len(), 1);
    }

    #[test]
    fn test_only_owner_or_admin_may_delete() {
        let (db, service, member, activity) = setup();
        let id = service.create(member, activity, &draft("Race day")).unwrap();
        let (other, admin) = db
            .transaction(|t| {
                Ok((
                    seed_profile(t, "other@example.com"),
                    seed_profile_with_level(t, "admin@example.com", auth_level::ADMIN),
                ))
            })
            .unwrap();

        assert!(matches!(
            service.delete(other, id).unwrap_err(),
            AppError::Forbidden(_)
        ));
        service.delete(admin, id).unwrap();
        assert!(matches!(service.get(admin, id).unwrap_err(), AppError::NotFound(_)));
    }
}
