//! Profile model for storage and API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

/// Authorization ranks. Lower is more privileged.
pub mod auth_level {
    /// Seeded at startup; cannot be edited or deleted.
    pub const DEFAULT_ADMIN: u8 = 0;
    pub const ADMIN: u8 = 1;
    pub const USER: u8 = 5;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub address: String,
    pub primary: bool,
}

/// Where a profile is based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProfileLocation {
    #[validate(length(min = 1, message = "The location address is blank"))]
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// User profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub firstname: String,
    pub lastname: String,
    pub middlename: Option<String>,
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub gender: Gender,
    /// 0 (sedentary) to 4 (athlete)
    pub fitness_level: u8,
    pub date_of_birth: NaiveDate,
    /// See [`auth_level`]
    pub auth_level: u8,
    /// Exactly one entry is primary
    pub emails: Vec<Email>,
    /// Argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub location: Option<ProfileLocation>,
    /// Names of the activity types the profile is interested in
    #[serde(default)]
    pub activity_types: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.auth_level <= auth_level::ADMIN
    }

    pub fn is_default_admin(&self) -> bool {
        self.auth_level == auth_level::DEFAULT_ADMIN
    }

    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.primary)
            .map(|e| e.address.as_str())
    }

    pub fn has_email(&self, address: &str) -> bool {
        self.emails
            .iter()
            .any(|e| e.address.eq_ignore_ascii_case(address))
    }
}

/// Registration request body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileDraft {
    #[validate(length(min = 1, message = "The first name field is blank"))]
    pub firstname: String,
    #[validate(length(min = 1, message = "The last name field is blank"))]
    pub lastname: String,
    #[serde(default)]
    pub middlename: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[validate(email(message = "The primary email is not a valid address"))]
    pub primary_email: String,
    #[serde(default)]
    pub additional_emails: Vec<String>,
    #[validate(length(min = 8, message = "The password is not long enough"))]
    pub password: String,
    pub gender: Gender,
    #[validate(range(min = 0, max = 4, message = "The fitness level isn't valid"))]
    pub fitness_level: u8,
    pub date_of_birth: NaiveDate,
}

/// Editable personal details. Emails, password, location and interests
/// have their own requests.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, message = "The first name field is blank"))]
    pub firstname: String,
    #[validate(length(min = 1, message = "The last name field is blank"))]
    pub lastname: String,
    #[serde(default)]
    pub middlename: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub gender: Gender,
    #[validate(range(min = 0, max = 4, message = "The fitness level isn't valid"))]
    pub fitness_level: u8,
    pub date_of_birth: NaiveDate,
}

/// Replacement email list. The primary address must always be present.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailUpdate {
    pub primary_email: String,
    #[serde(default)]
    pub additional_emails: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PasswordChange {
    pub current_password: String,
    #[validate(length(min = 8, message = "The password is not long enough"))]
    pub new_password: String,
    pub confirm_password: String,
}

/// How multiple activity types in a profile search combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// Profile must be interested in every listed type
    #[default]
    And,
    /// Any one listed type is enough
    Or,
}

/// Profile search filters. Text filters are case-insensitive substring
/// matches; empty filters are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileSearch {
    /// Matches any of the first, middle, last or nick names
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub middlename: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Comma separated activity type names
    #[serde(default)]
    pub activity_types: Option<String>,
    #[serde(default)]
    pub method: SearchMethod,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// A filter that is absent or blank matches everything.
fn filter(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ProfileSearch {
    pub fn type_names(&self) -> Vec<&str> {
        self.activity_types
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect()
    }

    pub fn matches(&self, profile: &Profile) -> bool {
        let optional = |field: &Option<String>, needle: &str| {
            field.as_deref().is_some_and(|value| contains_ci(value, needle))
        };

        if let Some(needle) = filter(&self.name) {
            let any = contains_ci(&profile.firstname, needle)
                || contains_ci(&profile.lastname, needle)
                || optional(&profile.middlename, needle)
                || optional(&profile.nickname, needle);
            if !any {
                return false;
            }
        }
        if filter(&self.firstname).is_some_and(|n| !contains_ci(&profile.firstname, n)) {
            return false;
        }
        if filter(&self.middlename).is_some_and(|n| !optional(&profile.middlename, n)) {
            return false;
        }
        if filter(&self.lastname).is_some_and(|n| !contains_ci(&profile.lastname, n)) {
            return false;
        }
        if filter(&self.nickname).is_some_and(|n| !optional(&profile.nickname, n)) {
            return false;
        }
        if let Some(needle) = filter(&self.email) {
            if !profile.emails.iter().any(|e| contains_ci(&e.address, needle)) {
                return false;
            }
        }

        let types = self.type_names();
        if types.is_empty() {
            return true;
        }
        let interested = |name: &&str| {
            profile
                .activity_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(name))
        };
        match self.method {
            SearchMethod::And => types.iter().all(interested),
            SearchMethod::Or => types.iter().any(interested),
        }
    }
}
