use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{ResourceAttrs, ResourceKind};
use crate::types::IssueTypeId;

/// A category issue reports are filed under, such as "Plumbing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueType {
    pub id: IssueTypeId,
    #[serde(rename = "type")]
    pub name: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssueType {
    #[must_use]
    pub const fn attrs() -> ResourceAttrs {
        ResourceAttrs::new(ResourceKind::IssueType)
    }
}
