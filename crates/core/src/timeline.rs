//! Issue report status history.
//!
//! Only the current status of a report is stored, so the history is inferred:
//! every entry after the first carries `updated_at`. A report that went
//! PENDING, IN_PROGRESS, RESOLVED shows the same timestamp for its
//! "Assigned" and "Completed" entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::IssueReport;
use crate::types::IssueStatus;

/// A step shown on the timeline. `Assigned` is never stored as a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimelineStatus {
    Pending,
    Assigned,
    InProgress,
    Resolved,
    Rejected,
}

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub status: TimelineStatus,
    pub timestamp: DateTime<Utc>,
    pub label: &'static str,
}

impl TimelineEntry {
    const fn new(status: TimelineStatus, timestamp: DateTime<Utc>, label: &'static str) -> Self {
        Self {
            status,
            timestamp,
            label,
        }
    }
}

/// Derive the ordered history of `report` from its current status.
#[must_use]
pub fn derive_timeline(report: &IssueReport) -> Vec<TimelineEntry> {
    let mut timeline = vec![TimelineEntry::new(
        TimelineStatus::Pending,
        report.created_at,
        "Reported",
    )];

    let (status, label) = match report.status {
        IssueStatus::Pending => return timeline,
        IssueStatus::InProgress => (TimelineStatus::InProgress, "In Progress"),
        IssueStatus::Resolved => (TimelineStatus::Resolved, "Completed"),
        IssueStatus::Rejected => (TimelineStatus::Rejected, "Rejected"),
    };

    if report.assignee_id.is_some() {
        timeline.push(TimelineEntry::new(
            TimelineStatus::Assigned,
            report.updated_at,
            "Assigned",
        ));
    }
    timeline.push(TimelineEntry::new(status, report.updated_at, label));

    timeline
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::{IssueReportId, ResidenceId, UserId};

    fn report(status: IssueStatus, assignee: Option<UserId>) -> IssueReport {
        IssueReport {
            id: IssueReportId::generate(),
            reporter_id: UserId::generate(),
            residence_id: ResidenceId::generate(),
            issue_type_id: None,
            description: "Leaking tap".to_owned(),
            image_urls: Vec::new(),
            status,
            assignee_id: assignee,
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().unwrap_or_default(),
            updated_at: Utc.with_ymd_and_hms(2024, 3, 4, 17, 30, 0).single().unwrap_or_default(),
        }
    }

    fn labels(timeline: &[TimelineEntry]) -> Vec<&'static str> {
        timeline.iter().map(|entry| entry.label).collect()
    }

    #[test]
    fn test_pending_report_has_single_entry() {
        let report = report(IssueStatus::Pending, None);
        let timeline = derive_timeline(&report);

        assert_eq!(
            timeline,
            vec![TimelineEntry::new(
                TimelineStatus::Pending,
                report.created_at,
                "Reported"
            )]
        );
    }

    #[test]
    fn test_pending_with_assignee_is_still_single_entry() {
        let timeline = derive_timeline(&report(IssueStatus::Pending, Some(UserId::generate())));
        assert_eq!(labels(&timeline), ["Reported"]);
    }

    #[test]
    fn test_in_progress_with_assignee() {
        let report = report(IssueStatus::InProgress, Some(UserId::generate()));
        let timeline = derive_timeline(&report);

        assert_eq!(labels(&timeline), ["Reported", "Assigned", "In Progress"]);
        assert!(timeline.iter().skip(1).all(|e| e.timestamp == report.updated_at));
    }

    #[test]
    fn test_resolved_is_labelled_completed() {
        let timeline = derive_timeline(&report(IssueStatus::Resolved, Some(UserId::generate())));
        assert_eq!(labels(&timeline), ["Reported", "Assigned", "Completed"]);
        assert_eq!(timeline[2].status, TimelineStatus::Resolved);
    }

    #[test]
    fn test_rejected_without_assignee() {
        let timeline = derive_timeline(&report(IssueStatus::Rejected, None));
        assert_eq!(labels(&timeline), ["Reported", "Rejected"]);
    }

    #[test]
    fn test_deterministic_and_monotonic() {
        let assignee = Some(UserId::generate());
        let pending = report(IssueStatus::Pending, assignee);
        let mut progressing = pending.clone();
        progressing.status = IssueStatus::InProgress;
        let mut resolved = pending.clone();
        resolved.status = IssueStatus::Resolved;

        assert_eq!(derive_timeline(&resolved), derive_timeline(&resolved));
        let lengths: Vec<_> = [&pending, &progressing, &resolved]
            .into_iter()
            .map(|r| derive_timeline(r).len())
            .collect();
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
    }
}
