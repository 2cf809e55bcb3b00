// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod membership;
pub mod notifications;
pub mod participation;
pub mod privacy;
pub mod profiles;

#[cfg(test)]
pub mod testing;

pub use activity::{ActivityService, ActivityView};
pub use membership::{MembershipService, RoleCounts};
pub use notifications::NotificationService;
pub use participation::ParticipationService;
pub use privacy::{MemberShare, PrivacyService};
pub use profiles::{ProfileService, ProfileView};
