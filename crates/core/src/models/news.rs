use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{ResourceAttrs, ResourceKind};
use crate::types::{NewsId, ResidenceId, UserId};

/// A news post published to one residence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: NewsId,
    pub author_id: UserId,
    pub residence_id: ResidenceId,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl News {
    #[must_use]
    pub fn attrs(&self) -> ResourceAttrs {
        ResourceAttrs::new(ResourceKind::News)
            .with_owner(self.author_id)
            .with_residence(self.residence_id)
    }
}
