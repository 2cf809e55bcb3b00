// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Fitness-Tracker: social fitness activities with roles and notifications
//!
//! This crate provides the backend API for profiles, activities, activity
//! memberships and the notifications members receive when activities change.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::MemoryDb;
use services::{
    ActivityService, MembershipService, NotificationService, ParticipationService,
    PrivacyService, ProfileService,
};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: MemoryDb,
    pub activity_service: ActivityService,
    pub membership_service: MembershipService,
    pub privacy_service: PrivacyService,
    pub notification_service: NotificationService,
    pub participation_service: ParticipationService,
    pub profile_service: ProfileService,
}

impl AppState {
    /// Wire every service to one store.
    pub fn new(config: Config, db: MemoryDb) -> Self {
        Self {
            activity_service: ActivityService::new(db.clone()),
            membership_service: MembershipService::new(db.clone()),
            privacy_service: PrivacyService::new(db.clone()),
            notification_service: NotificationService::new(db.clone()),
            participation_service: ParticipationService::new(db.clone()),
            profile_service: ProfileService::new(db.clone()),
            config,
            db,
        }
    }

    /// Load reference data and the default admin.
    pub fn seed(&self) -> error::Result<u64> {
        let types = self
            .profile_service
            .seed_activity_types(&self.config.activity_types)?;
        tracing::info!(count = types, "Activity types loaded");
        self.profile_service.seed_default_admin(
            &self.config.default_admin_email,
            &self.config.default_admin_password,
        )
    }
}
