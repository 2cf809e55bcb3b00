//! Seed helpers shared by service unit tests.

use crate::db::Tables;
use crate::models::{
    auth_level, Activity, ActivityMembership, Email, Gender, PrivacyLevel, Profile, Role,
};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeSet;

pub fn seed_profile(t: &mut Tables, email: &str) -> u64 {
    seed_profile_with_level(t, email, auth_level::USER)
}

pub fn seed_profile_with_level(t: &mut Tables, email: &str, level: u8) -> u64 {
    let id = t.next_id();
    t.insert_profile(Profile {
        id,
        firstname: "Test".to_string(),
        lastname: format!("Profile{}", id),
        middlename: None,
        nickname: None,
        bio: None,
        gender: Gender::Female,
        fitness_level: 2,
        date_of_birth: NaiveDate::from_ymd_opt(1995, 6, 15).unwrap(),
        auth_level: level,
        emails: vec![Email {
            address: email.to_string(),
            primary: true,
        }],
        password_hash: String::new(),
        location: None,
        activity_types: BTreeSet::new(),
        created_at: Utc::now(),
    });
    id
}

/// Insert a public "Hiking" activity without any memberships.
pub fn seed_activity(t: &mut Tables, name: &str) -> u64 {
    let type_id = t.ensure_activity_type("Hiking");
    let id = t.next_id();
    t.save_activity(Activity {
        id,
        name: name.to_string(),
        description: "A big and nice race on a lovely peninsula".to_string(),
        continuous: true,
        start_time: None,
        end_time: None,
        location: Some("Kaikoura, NZ".to_string()),
        activity_types: BTreeSet::from([type_id]),
        privacy: PrivacyLevel::Public,
        created_at: Utc::now(),
    });
    t.attach_activity_type(type_id, id);
    id
}

pub fn seed_member(t: &mut Tables, profile_id: u64, activity_id: u64, role: Role) -> u64 {
    let id = t.next_id();
    t.save_membership(ActivityMembership {
        id,
        profile_id,
        activity_id,
        role,
        joined_at: Utc::now(),
    });
    id
}
