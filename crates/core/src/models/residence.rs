use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{ResourceAttrs, ResourceKind};
use crate::types::{ResidenceId, UserId};

/// A property residents can join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Residence {
    pub id: ResidenceId,
    pub name: String,
    /// Human-readable code, unique across residences.
    pub code: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    /// Free-text category such as "apartment" or "condo".
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Residence {
    #[must_use]
    pub fn attrs(&self) -> ResourceAttrs {
        ResourceAttrs::new(ResourceKind::Residence)
            .with_owner(self.creator_id)
            .with_residence(self.id)
    }
}
