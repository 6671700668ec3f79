use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserSummary;
use crate::access::{ResourceAttrs, ResourceKind};
use crate::types::{JoinStatus, MembershipId, ResidenceId, UserId};

/// Links a user to a residence.
///
/// At most one membership per (user, residence) pair is active, meaning not
/// [`JoinStatus::Rejected`]. `version` increments on every status write and
/// guards decisions against lost updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub residence_id: ResidenceId,
    pub join_status: JoinStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Attributes for authorization. The residence creators must be filled in
    /// by the caller, who knows the residence.
    #[must_use]
    pub fn attrs(&self) -> ResourceAttrs {
        ResourceAttrs::new(ResourceKind::Membership)
            .with_owner(self.user_id)
            .with_residence(self.residence_id)
    }
}

/// A membership together with the member it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipDetail {
    #[serde(flatten)]
    pub membership: Membership,
    pub user: UserSummary,
}
