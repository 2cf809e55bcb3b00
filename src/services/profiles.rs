// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile registration, credentials and deletion.

use crate::db::{MemoryDb, Tables};
use crate::error::{AppError, Result, ValidationError};
use crate::models::{
    auth_level, Email, EmailUpdate, Gender, PasswordChange, Profile, ProfileDraft,
    ProfileLocation, ProfileSearch, ProfileUpdate,
};
use crate::services::activity::delete_activity_cascade;
use crate::services::notifications::detach_profile;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{NaiveDate, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use std::collections::BTreeSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidateEmail};

/// Profile as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileView {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    pub firstname: String,
    pub lastname: String,
    pub middlename: Option<String>,
    pub nickname: Option<String>,
    pub bio: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub gender: Gender,
    pub fitness_level: u8,
    pub date_of_birth: String,
    pub primary_email: Option<String>,
    pub additional_emails: Vec<String>,
    pub auth_level: u8,
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub location: Option<ProfileLocation>,
    pub activity_types: Vec<String>,
}

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            firstname: profile.firstname.clone(),
            lastname: profile.lastname.clone(),
            middlename: profile.middlename.clone(),
            nickname: profile.nickname.clone(),
            bio: profile.bio.clone(),
            gender: profile.gender,
            fitness_level: profile.fitness_level,
            date_of_birth: profile.date_of_birth.format("%Y-%m-%d").to_string(),
            primary_email: profile.primary_email().map(str::to_string),
            additional_emails: profile
                .emails
                .iter()
                .filter(|e| !e.primary)
                .map(|e| e.address.clone())
                .collect(),
            auth_level: profile.auth_level,
            location: profile.location.clone(),
            activity_types: profile.activity_types.iter().cloned().collect(),
        }
    }
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Salt encoding failed: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, password_hash: &str) -> bool {
    let hash = match PasswordHash::new(password_hash) {
        Ok(hash) => hash,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &hash)
        .is_ok()
}

fn blank_name(firstname: &str, lastname: &str) -> Result<()> {
    if firstname.trim().is_empty() {
        return Err(ValidationError::Profile("The first name field is blank".to_string()).into());
    }
    if lastname.trim().is_empty() {
        return Err(ValidationError::Profile("The last name field is blank".to_string()).into());
    }
    Ok(())
}

/// Normalise an email list, primary first.
///
/// Addresses must be valid and distinct, and no profile other than `owner`
/// may already use them.
fn normalise_emails(
    tables: &Tables,
    primary: &str,
    additional: &[String],
    owner: Option<u64>,
) -> Result<Vec<Email>> {
    let mut emails: Vec<Email> = Vec::with_capacity(1 + additional.len());
    let addresses = std::iter::once(primary).chain(additional.iter().map(String::as_str));
    for (i, address) in addresses.enumerate() {
        let address = address.trim();
        if !address.to_string().validate_email() {
            return Err(ValidationError::Profile(format!(
                "'{}' is not a valid email address",
                address
            ))
            .into());
        }
        if emails.iter().any(|e| e.address.eq_ignore_ascii_case(address)) {
            return Err(ValidationError::Profile(format!("'{}' is listed twice", address)).into());
        }
        if let Some(existing) = tables.profile_by_email(address) {
            if Some(existing.id) != owner {
                return Err(AppError::Conflict(format!(
                    "The email {} is already in use",
                    address
                )));
            }
        }
        emails.push(Email {
            address: address.to_string(),
            primary: i == 0,
        });
    }
    Ok(emails)
}

/// Check field rules and collect the normalised email list, primary first.
fn validate_draft(tables: &Tables, draft: &ProfileDraft) -> Result<Vec<Email>> {
    draft
        .validate()
        .map_err(|e| ValidationError::Profile(e.to_string()))?;
    blank_name(&draft.firstname, &draft.lastname)?;
    normalise_emails(
        tables,
        &draft.primary_email,
        &draft.additional_emails,
        None,
    )
}

/// The target profile, if `actor_id` may edit it: the profile itself or an admin.
fn editable_profile(tables: &mut Tables, actor_id: u64, target_id: u64) -> Result<&mut Profile> {
    if actor_id != target_id && !tables.is_admin(actor_id) {
        return Err(AppError::Forbidden(format!(
            "Profile {} may not edit profile {}",
            actor_id, target_id
        )));
    }
    tables
        .profile_mut(target_id)
        .ok_or_else(|| AppError::profile_not_found(target_id))
}

#[derive(Clone)]
pub struct ProfileService {
    db: MemoryDb,
}

impl ProfileService {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }

    /// Register a new profile at the normal user level.
    pub fn register(&self, draft: &ProfileDraft) -> Result<u64> {
        // Hash before taking the write lock.
        let password_hash = hash_password(&draft.password)?;

        self.db.transaction(|t| {
            let emails = validate_draft(t, draft)?;
            let id = t.next_id();
            t.insert_profile(Profile {
                id,
                firstname: draft.firstname.trim().to_string(),
                lastname: draft.lastname.trim().to_string(),
                middlename: draft.middlename.clone(),
                nickname: draft.nickname.clone(),
                bio: draft.bio.clone(),
                gender: draft.gender,
                fitness_level: draft.fitness_level,
                date_of_birth: draft.date_of_birth,
                auth_level: auth_level::USER,
                emails,
                password_hash,
                location: None,
                activity_types: BTreeSet::new(),
                created_at: Utc::now(),
            });
            tracing::info!(profile_id = id, "Profile registered");
            Ok(id)
        })
    }

    /// Check credentials against any of the profile's emails.
    pub fn login(&self, email: &str, password: &str) -> Result<Profile> {
        let profile = self
            .db
            .read(|t| Ok(t.profile_by_email(email.trim()).cloned()))?;
        match profile {
            Some(profile) if verify_password(password, &profile.password_hash) => {
                tracing::info!(profile_id = profile.id, "Login succeeded");
                Ok(profile)
            }
            _ => {
                tracing::debug!("Login rejected");
                Err(AppError::Unauthorized)
            }
        }
    }

    pub fn get(&self, profile_id: u64) -> Result<Profile> {
        self.db.read(|t| {
            t.profile(profile_id)
                .cloned()
                .ok_or_else(|| AppError::profile_not_found(profile_id))
        })
    }

    /// Replace the personal details of a profile.
    pub fn update_profile(
        &self,
        actor_id: u64,
        target_id: u64,
        update: &ProfileUpdate,
    ) -> Result<()> {
        update
            .validate()
            .map_err(|e| ValidationError::Profile(e.to_string()))?;
        blank_name(&update.firstname, &update.lastname)?;

        self.db.transaction(|t| {
            let profile = editable_profile(t, actor_id, target_id)?;
            profile.firstname = update.firstname.trim().to_string();
            profile.lastname = update.lastname.trim().to_string();
            profile.middlename = update.middlename.clone();
            profile.nickname = update.nickname.clone();
            profile.bio = update.bio.clone();
            profile.gender = update.gender;
            profile.fitness_level = update.fitness_level;
            profile.date_of_birth = update.date_of_birth;
            tracing::info!(actor_id, target_id, "Profile updated");
            Ok(())
        })
    }

    /// Replace the email list. The profile keeps exactly one primary address
    /// and may reuse any address it already owns.
    pub fn update_emails(
        &self,
        actor_id: u64,
        target_id: u64,
        update: &EmailUpdate,
    ) -> Result<()> {
        self.db.transaction(|t| {
            editable_profile(t, actor_id, target_id)?;
            let emails = normalise_emails(
                t,
                &update.primary_email,
                &update.additional_emails,
                Some(target_id),
            )?;
            let profile = editable_profile(t, actor_id, target_id)?;
            tracing::info!(actor_id, target_id, count = emails.len(), "Emails updated");
            profile.emails = emails;
            Ok(())
        })
    }

    /// Change the password after checking the current one.
    pub fn change_password(
        &self,
        actor_id: u64,
        target_id: u64,
        change: &PasswordChange,
    ) -> Result<()> {
        if actor_id != target_id {
            return Err(AppError::Forbidden(
                "Passwords can only be changed by their owner".to_string(),
            ));
        }
        change
            .validate()
            .map_err(|e| ValidationError::Profile(e.to_string()))?;
        if change.new_password != change.confirm_password {
            return Err(
                ValidationError::Profile("The new passwords do not match".to_string()).into(),
            );
        }

        let stored = self.get(target_id)?.password_hash;
        if !verify_password(&change.current_password, &stored) {
            tracing::debug!(target_id, "Password change rejected");
            return Err(ValidationError::Profile(
                "The current password is incorrect".to_string(),
            )
            .into());
        }
        let password_hash = hash_password(&change.new_password)?;

        self.db.transaction(|t| {
            let profile = editable_profile(t, actor_id, target_id)?;
            if profile.password_hash != stored {
                return Err(AppError::Conflict(
                    "The password was changed concurrently".to_string(),
                ));
            }
            profile.password_hash = password_hash;
            tracing::info!(target_id, "Password changed");
            Ok(())
        })
    }

    /// Set or replace where the profile is based.
    pub fn update_location(
        &self,
        actor_id: u64,
        target_id: u64,
        location: &ProfileLocation,
    ) -> Result<()> {
        location
            .validate()
            .map_err(|e| ValidationError::Profile(e.to_string()))?;
        if location.address.trim().is_empty() {
            return Err(
                ValidationError::Profile("The location address is blank".to_string()).into(),
            );
        }
        self.db.transaction(|t| {
            let profile = editable_profile(t, actor_id, target_id)?;
            profile.location = Some(location.clone());
            tracing::info!(actor_id, target_id, "Profile location updated");
            Ok(())
        })
    }

    /// Clear the profile's location. Clearing an unset location is a no-op.
    pub fn delete_location(&self, actor_id: u64, target_id: u64) -> Result<()> {
        self.db.transaction(|t| {
            let profile = editable_profile(t, actor_id, target_id)?;
            if profile.location.take().is_some() {
                tracing::info!(actor_id, target_id, "Profile location removed");
            }
            Ok(())
        })
    }

    /// Replace the activity types the profile is interested in. Every name
    /// must be a known activity type.
    pub fn update_activity_types(
        &self,
        actor_id: u64,
        target_id: u64,
        names: &[String],
    ) -> Result<()> {
        self.db.transaction(|t| {
            let mut interests = BTreeSet::new();
            for name in names {
                let known = t
                    .activity_type_by_name(name.trim())
                    .ok_or_else(|| ValidationError::InvalidType(name.clone()))?;
                interests.insert(known.name.clone());
            }
            let profile = editable_profile(t, actor_id, target_id)?;
            tracing::info!(actor_id, target_id, count = interests.len(), "Interests updated");
            profile.activity_types = interests;
            Ok(())
        })
    }

    /// Profiles matching every filter in `search`, in id order. The default
    /// admin never appears.
    pub fn search(
        &self,
        search: &ProfileSearch,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Profile>> {
        self.db.read(|t| {
            Ok(t.profiles()
                .filter(|p| !p.is_default_admin())
                .filter(|p| search.matches(p))
                .skip(offset)
                .take(limit)
                .cloned()
                .collect())
        })
    }

    /// Change a profile's auth level. Only admins may do this, and the default
    /// admin's level never changes.
    pub fn set_auth_level(&self, actor_id: u64, target_id: u64, level: u8) -> Result<()> {
        self.db.transaction(|t| {
            if !t.is_admin(actor_id) {
                return Err(AppError::Forbidden(
                    "Only admins may change auth levels".to_string(),
                ));
            }
            if !(auth_level::ADMIN..=auth_level::USER).contains(&level) {
                return Err(AppError::BadRequest(format!(
                    "Auth level must be between {} and {}",
                    auth_level::ADMIN,
                    auth_level::USER
                )));
            }
            let target = t
                .profile_mut(target_id)
                .ok_or_else(|| AppError::profile_not_found(target_id))?;
            if target.is_default_admin() {
                return Err(AppError::Forbidden(
                    "The default admin cannot be edited".to_string(),
                ));
            }

            tracing::info!(
                actor_id,
                target_id,
                from = target.auth_level,
                to = level,
                "Auth level changed"
            );
            target.auth_level = level;
            Ok(())
        })
    }

    /// Delete a profile and everything it owns.
    ///
    /// Activities the profile created are deleted outright. Its other
    /// memberships and participations go, and it is detached from every
    /// notification.
    pub fn delete_profile(&self, actor_id: u64, target_id: u64) -> Result<()> {
        self.db.transaction(|t| {
            let target = t
                .profile(target_id)
                .cloned()
                .ok_or_else(|| AppError::profile_not_found(target_id))?;
            if actor_id != target_id && !t.is_admin(actor_id) {
                return Err(AppError::Forbidden(format!(
                    "Profile {} may not delete profile {}",
                    actor_id, target_id
                )));
            }
            if target.is_default_admin() {
                return Err(AppError::Forbidden(
                    "The default admin cannot be deleted".to_string(),
                ));
            }

            let created: Vec<u64> = t
                .memberships_for_profile(target_id)
                .iter()
                .filter(|m| m.role.is_creator())
                .map(|m| m.activity_id)
                .collect();
            for activity_id in &created {
                delete_activity_cascade(t, *activity_id)?;
            }

            let remaining: Vec<u64> = t
                .memberships_for_profile(target_id)
                .iter()
                .map(|m| m.id)
                .collect();
            for id in &remaining {
                t.delete_membership(*id);
            }
            let participations = t.delete_participations_where(|p| p.profile_id == target_id);
            let notifications = detach_profile(t, target_id);
            t.remove_profile(target_id);

            tracing::info!(
                actor_id,
                target_id,
                activities = created.len(),
                memberships = remaining.len(),
                participations,
                notifications,
                "Profile deleted"
            );
            Ok(())
        })
    }

    /// Create the default admin unless a profile already owns its email.
    pub fn seed_default_admin(&self, email: &str, password: &str) -> Result<u64> {
        if let Some(existing) = self.db.read(|t| Ok(t.profile_by_email(email).map(|p| p.id)))? {
            return Ok(existing);
        }
        let password_hash = hash_password(password)?;

        self.db.transaction(|t| {
            let id = t.next_id();
            t.insert_profile(Profile {
                id,
                firstname: "Default".to_string(),
                lastname: "Admin".to_string(),
                middlename: None,
                nickname: None,
                bio: None,
                gender: Gender::NonBinary,
                fitness_level: 0,
                date_of_birth: NaiveDate::default(),
                auth_level: auth_level::DEFAULT_ADMIN,
                emails: vec![Email {
                    address: email.to_string(),
                    primary: true,
                }],
                password_hash,
                location: None,
                activity_types: BTreeSet::new(),
                created_at: Utc::now(),
            });
            tracing::info!(profile_id = id, "Seeded default admin");
            Ok(id)
        })
    }

    /// Load the reference activity types. Existing names are kept.
    pub fn seed_activity_types<S: AsRef<str>>(&self, names: &[S]) -> Result<usize> {
        self.db.transaction(|t| {
            for name in names {
                t.ensure_activity_type(name.as_ref());
            }
            Ok(names.len())
        })
    }
}
