use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{ResourceAttrs, ResourceKind};
use crate::types::{IssueReportId, IssueStatus, IssueTypeId, ResidenceId, UserId};

/// A maintenance issue filed by a resident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReport {
    pub id: IssueReportId,
    pub reporter_id: UserId,
    pub residence_id: ResidenceId,
    pub issue_type_id: Option<IssueTypeId>,
    pub description: String,
    pub image_urls: Vec<String>,
    pub status: IssueStatus,
    pub assignee_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IssueReport {
    /// Attributes for authorization. The assignee is the concerned party.
    #[must_use]
    pub fn attrs(&self) -> ResourceAttrs {
        let attrs = ResourceAttrs::new(ResourceKind::IssueReport)
            .with_owner(self.reporter_id)
            .with_residence(self.residence_id);
        match self.assignee_id {
            Some(assignee) => attrs.with_concerned(assignee),
            None => attrs,
        }
    }
}
