//! Lifecycle status enums for memberships and scoped resources.

use serde::{Deserialize, Serialize};

/// Join status of a residence membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "join_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JoinStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Outcome of asking whether a membership may move to a new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinTransition {
    /// Target equals the current status. Nothing to write.
    Unchanged,
    /// The move is a defined business flow.
    Allowed,
    /// The move is not a defined business flow.
    Refused,
}

impl JoinStatus {
    /// Returns true for statuses that count towards the one-active-membership
    /// rule. Rejection is terminal and frees the (user, residence) pair.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    /// Returns true for statuses an authority may decide on.
    #[must_use]
    pub const fn is_decision(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Classify the move from `self` to `next`.
    ///
    /// ```text
    /// PENDING  -> APPROVED | REJECTED
    /// APPROVED -> REJECTED              (revocation)
    /// REJECTED -> (terminal)
    /// ```
    #[must_use]
    pub const fn transition_to(self, next: Self) -> JoinTransition {
        match (self, next) {
            (Self::Pending, Self::Pending)
            | (Self::Approved, Self::Approved)
            | (Self::Rejected, Self::Rejected) => JoinTransition::Unchanged,
            (Self::Pending, Self::Approved | Self::Rejected) | (Self::Approved, Self::Rejected) => {
                JoinTransition::Allowed
            }
            (Self::Approved | Self::Rejected, Self::Pending) | (Self::Rejected, Self::Approved) => {
                JoinTransition::Refused
            }
        }
    }

    /// Returns the wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for JoinStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an issue report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "issue_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl IssueStatus {
    /// Returns true once the report can no longer progress.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

/// Status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "appointment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_can_be_decided_either_way() {
        assert_eq!(
            JoinStatus::Pending.transition_to(JoinStatus::Approved),
            JoinTransition::Allowed
        );
        assert_eq!(
            JoinStatus::Pending.transition_to(JoinStatus::Rejected),
            JoinTransition::Allowed
        );
    }

    #[test]
    fn test_same_status_is_unchanged() {
        for status in [JoinStatus::Pending, JoinStatus::Approved, JoinStatus::Rejected] {
            assert_eq!(status.transition_to(status), JoinTransition::Unchanged);
        }
    }

    #[test]
    fn test_approved_can_be_revoked() {
        assert_eq!(
            JoinStatus::Approved.transition_to(JoinStatus::Rejected),
            JoinTransition::Allowed
        );
    }

    #[test]
    fn test_no_way_back_to_pending_and_rejection_is_terminal() {
        assert_eq!(
            JoinStatus::Approved.transition_to(JoinStatus::Pending),
            JoinTransition::Refused
        );
        assert_eq!(
            JoinStatus::Rejected.transition_to(JoinStatus::Pending),
            JoinTransition::Refused
        );
        assert_eq!(
            JoinStatus::Rejected.transition_to(JoinStatus::Approved),
            JoinTransition::Refused
        );
    }

    #[test]
    fn test_only_rejected_is_inactive() {
        assert!(JoinStatus::Pending.is_active());
        assert!(JoinStatus::Approved.is_active());
        assert!(!JoinStatus::Rejected.is_active());
    }

    #[test]
    fn test_issue_status_wire_names() {
        let json = serde_json::to_string(&IssueStatus::InProgress).unwrap_or_default();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }
}
