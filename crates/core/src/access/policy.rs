//! The declarative access policy and the decision function over it.
//!
//! Every (resource kind, operation) pair maps to a [`Rule`]: the roles that
//! bypass relationship checks, plus the relationships that admit a subject.
//! [`can_access`] evaluates a rule in a fixed order and the first match wins:
//!
//! 1. subject role in the rule's bypass set
//! 2. subject owns the resource
//! 3. subject is the concerned party (reads and status writes only)
//! 4. subject is an approved member of the resource's residence (reads only)
//! 5. subject created a residence the resource is escalated to
//! 6. deny
//!
//! All inputs are pre-loaded into [`SubjectAttrs`] and [`ResourceAttrs`], so
//! evaluation never touches the store.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::types::{ResidenceId, Role, UserId};

/// Which part of a resource a write touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteKind {
    /// Title, body, images and other user-authored fields.
    Content,
    /// Lifecycle status, assignment or a membership decision.
    Status,
}

/// An operation a subject attempts on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Read,
    Write(WriteKind),
    Delete,
}

impl Operation {
    /// Shorthand for a content write.
    pub const WRITE_CONTENT: Self = Self::Write(WriteKind::Content);
    /// Shorthand for a status write.
    pub const WRITE_STATUS: Self = Self::Write(WriteKind::Status);

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write(_) => "WRITE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of resource guarded by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Residence,
    Membership,
    News,
    IssueType,
    IssueReport,
    Appointment,
}

impl ResourceKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Residence => "residence",
            Self::Membership => "membership",
            Self::News => "news",
            Self::IssueType => "issue type",
            Self::IssueReport => "issue report",
            Self::Appointment => "appointment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relationship between subject and resource that a rule may admit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// Every authenticated subject.
    Any,
    /// The subject created the resource.
    Owner,
    /// The subject is the concerned or assigned party.
    ConcernedParty,
    /// The subject holds an approved membership in the resource's residence.
    ResidenceMember,
    /// The subject created a residence the resource is escalated to.
    ResidenceCreator,
}

/// Roles and relationships admitted for one (kind, operation) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub bypass: &'static [Role],
    pub relations: &'static [Relation],
}

impl Rule {
    const fn new(bypass: &'static [Role], relations: &'static [Relation]) -> Self {
        Self { bypass, relations }
    }

    #[must_use]
    pub fn admits(&self, relation: Relation) -> bool {
        self.relations.contains(&relation)
    }
}

const MANAGEMENT: &[Role] = &[Role::Manager, Role::Admin, Role::SuperAdmin];

/// The policy table.
///
/// | kind         | read                                   | content write        | status write              | delete     |
/// |--------------|----------------------------------------|----------------------|---------------------------|------------|
/// | residence    | any                                    | admin tier           | admin tier                | admin tier |
/// | membership   | management, owner, creator             | management, creator  | management, creator       | admin tier |
/// | news         | elevated, owner, member                | admin tier, owner    | admin tier, owner         | admin tier |
/// | issue type   | any                                    | admin tier           | admin tier                | admin tier |
/// | issue report | elevated, owner, concerned, creator    | admin tier, owner    | management, concerned     | admin tier |
/// | appointment  | admin tier, owner, concerned           | admin tier           | admin tier, concerned     | admin tier |
#[must_use]
pub const fn rule_for(kind: ResourceKind, operation: Operation) -> Rule {
    use Relation::{Any, ConcernedParty, Owner, ResidenceCreator, ResidenceMember};

    match (kind, operation) {
        (ResourceKind::Residence | ResourceKind::IssueType, Operation::Read) => {
            Rule::new(&[], &[Any])
        }
        (ResourceKind::Membership, Operation::Read) => {
            Rule::new(MANAGEMENT, &[Owner, ResidenceCreator])
        }
        (ResourceKind::Membership, Operation::Write(_)) => {
            Rule::new(MANAGEMENT, &[ResidenceCreator])
        }
        (ResourceKind::News, Operation::Read) => {
            Rule::new(Role::ELEVATED, &[Owner, ResidenceMember])
        }
        (ResourceKind::News, Operation::Write(_))
        | (ResourceKind::IssueReport, Operation::Write(WriteKind::Content)) => {
            Rule::new(Role::ADMIN_TIER, &[Owner])
        }
        (ResourceKind::IssueReport, Operation::Read) => {
            Rule::new(Role::ELEVATED, &[Owner, ConcernedParty, ResidenceCreator])
        }
        (ResourceKind::IssueReport, Operation::Write(WriteKind::Status)) => {
            Rule::new(MANAGEMENT, &[ConcernedParty])
        }
        (ResourceKind::Appointment, Operation::Read) => {
            Rule::new(Role::ADMIN_TIER, &[Owner, ConcernedParty])
        }
        (ResourceKind::Appointment, Operation::Write(WriteKind::Status)) => {
            Rule::new(Role::ADMIN_TIER, &[ConcernedParty])
        }
        (
            ResourceKind::Residence | ResourceKind::IssueType,
            Operation::Write(_) | Operation::Delete,
        )
        | (ResourceKind::Appointment, Operation::Write(WriteKind::Content))
        | (
            ResourceKind::Membership
            | ResourceKind::News
            | ResourceKind::IssueReport
            | ResourceKind::Appointment,
            Operation::Delete,
        ) => Rule::new(Role::ADMIN_TIER, &[]),
    }
}

/// Attributes of the subject making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectAttrs {
    pub user_id: UserId,
    pub role: Role,
    /// Residences where the subject holds an approved membership.
    pub approved_residences: BTreeSet<ResidenceId>,
}

impl SubjectAttrs {
    /// A subject with no approved memberships.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            role,
            approved_residences: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_approved_residences(
        mut self,
        residences: impl IntoIterator<Item = ResidenceId>,
    ) -> Self {
        self.approved_residences = residences.into_iter().collect();
        self
    }

    /// Returns true if the subject holds an approved membership in `residence`.
    #[must_use]
    pub fn is_member_of(&self, residence: ResidenceId) -> bool {
        self.approved_residences.contains(&residence)
    }
}

/// Attributes of the resource being accessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAttrs {
    pub kind: ResourceKind,
    pub owner_id: Option<UserId>,
    pub residence_id: Option<ResidenceId>,
    pub concerned_id: Option<UserId>,
    /// Creators of the residences this resource escalates to.
    ///
    /// For a membership this is the creator of its residence. For an issue
    /// report it is every creator of a residence where the reporter holds an
    /// approved membership.
    pub residence_creator_ids: Vec<UserId>,
}

impl ResourceAttrs {
    #[must_use]
    pub const fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            owner_id: None,
            residence_id: None,
            concerned_id: None,
            residence_creator_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner_id = Some(owner);
        self
    }

    #[must_use]
    pub fn with_residence(mut self, residence: ResidenceId) -> Self {
        self.residence_id = Some(residence);
        self
    }

    #[must_use]
    pub fn with_concerned(mut self, concerned: UserId) -> Self {
        self.concerned_id = Some(concerned);
        self
    }

    #[must_use]
    pub fn with_residence_creators(mut self, creators: impl IntoIterator<Item = UserId>) -> Self {
        self.residence_creator_ids.extend(creators);
        self
    }

    fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == Some(user)
    }

    fn concerns(&self, user: UserId) -> bool {
        self.concerned_id == Some(user)
    }
}

/// Why access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grant {
    Role(Role),
    Relation(Relation),
}

/// Outcome of [`can_access`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(Grant),
    Deny,
}

impl Decision {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow(_))
    }
}

/// A denied access attempt.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{operation} on {kind} is not permitted")]
pub struct AccessDenied {
    pub operation: Operation,
    pub kind: ResourceKind,
}

/// Decide whether `subject` may perform `operation` on `resource`.
pub fn can_access(subject: &SubjectAttrs, resource: &ResourceAttrs, operation: Operation) -> Decision {
    let decision = evaluate(subject, resource, operation);
    tracing::debug!(
        user_id = %subject.user_id,
        role = %subject.role,
        kind = %resource.kind,
        operation = ?operation,
        decision = ?decision,
        "access decision"
    );
    decision
}

/// Like [`can_access`], but turns a denial into an error.
///
/// # Errors
///
/// Returns [`AccessDenied`] carrying the operation and resource kind.
pub fn authorize(
    subject: &SubjectAttrs,
    resource: &ResourceAttrs,
    operation: Operation,
) -> Result<Grant, AccessDenied> {
    match can_access(subject, resource, operation) {
        Decision::Allow(grant) => Ok(grant),
        Decision::Deny => Err(AccessDenied {
            operation,
            kind: resource.kind,
        }),
    }
}

fn evaluate(subject: &SubjectAttrs, resource: &ResourceAttrs, operation: Operation) -> Decision {
    let rule = rule_for(resource.kind, operation);

    if subject.role.is_one_of(rule.bypass) {
        return Decision::Allow(Grant::Role(subject.role));
    }
    if rule.admits(Relation::Any) {
        return Decision::Allow(Grant::Relation(Relation::Any));
    }
    // Relationships never grant deletion.
    if operation == Operation::Delete {
        return Decision::Deny;
    }

    if rule.admits(Relation::Owner) && resource.is_owned_by(subject.user_id) {
        return Decision::Allow(Grant::Relation(Relation::Owner));
    }

    if rule.admits(Relation::ConcernedParty)
        && resource.concerns(subject.user_id)
        && matches!(operation, Operation::Read | Operation::WRITE_STATUS)
    {
        return Decision::Allow(Grant::Relation(Relation::ConcernedParty));
    }

    if rule.admits(Relation::ResidenceMember)
        && operation == Operation::Read
        && resource
            .residence_id
            .is_some_and(|residence| subject.is_member_of(residence))
    {
        return Decision::Allow(Grant::Relation(Relation::ResidenceMember));
    }

    if rule.admits(Relation::ResidenceCreator)
        && resource.residence_creator_ids.contains(&subject.user_id)
    {
        return Decision::Allow(Grant::Relation(Relation::ResidenceCreator));
    }

    Decision::Deny
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(role: Role) -> SubjectAttrs {
        SubjectAttrs::new(UserId::generate(), role)
    }

    fn news_in(residence: ResidenceId, author: UserId) -> ResourceAttrs {
        ResourceAttrs::new(ResourceKind::News)
            .with_owner(author)
            .with_residence(residence)
    }

    #[test]
    fn test_bypass_role_wins_first() {
        let admin = user(Role::Admin);
        let news = news_in(ResidenceId::generate(), UserId::generate());

        assert_eq!(
            can_access(&admin, &news, Operation::Delete),
            Decision::Allow(Grant::Role(Role::Admin))
        );
    }

    #[test]
    fn test_non_member_cannot_read_residence_news() {
        let resident = user(Role::User);
        let news = news_in(ResidenceId::generate(), UserId::generate());

        assert_eq!(can_access(&resident, &news, Operation::Read), Decision::Deny);
    }

    #[test]
    fn test_approved_member_reads_but_cannot_write() {
        let residence = ResidenceId::generate();
        let member = user(Role::User).with_approved_residences([residence]);
        let news = news_in(residence, UserId::generate());

        assert_eq!(
            can_access(&member, &news, Operation::Read),
            Decision::Allow(Grant::Relation(Relation::ResidenceMember))
        );
        assert_eq!(
            can_access(&member, &news, Operation::WRITE_CONTENT),
            Decision::Deny
        );
    }

    #[test]
    fn test_owner_never_deletes_without_role() {
        let manager = user(Role::Manager);
        let news = news_in(ResidenceId::generate(), manager.user_id);

        assert!(can_access(&manager, &news, Operation::WRITE_CONTENT).is_allowed());
        assert_eq!(can_access(&manager, &news, Operation::Delete), Decision::Deny);
    }

    #[test]
    fn test_concerned_party_reads_and_updates_status_only() {
        let concerned = user(Role::User);
        let appointment = ResourceAttrs::new(ResourceKind::Appointment)
            .with_owner(UserId::generate())
            .with_concerned(concerned.user_id);

        assert!(can_access(&concerned, &appointment, Operation::Read).is_allowed());
        assert!(can_access(&concerned, &appointment, Operation::WRITE_STATUS).is_allowed());
        assert_eq!(
            can_access(&concerned, &appointment, Operation::WRITE_CONTENT),
            Decision::Deny
        );
        assert_eq!(
            can_access(&concerned, &appointment, Operation::Delete),
            Decision::Deny
        );
    }

    #[test]
    fn test_appointment_owner_cannot_update() {
        let owner = user(Role::User);
        let appointment = ResourceAttrs::new(ResourceKind::Appointment)
            .with_owner(owner.user_id)
            .with_concerned(UserId::generate());

        assert!(can_access(&owner, &appointment, Operation::Read).is_allowed());
        assert_eq!(
            can_access(&owner, &appointment, Operation::WRITE_STATUS),
            Decision::Deny
        );
    }

    #[test]
    fn test_residence_creator_escalation_on_issue_report() {
        let creator = user(Role::User);
        let report = ResourceAttrs::new(ResourceKind::IssueReport)
            .with_owner(UserId::generate())
            .with_residence(ResidenceId::generate())
            .with_residence_creators([creator.user_id]);

        assert_eq!(
            can_access(&creator, &report, Operation::Read),
            Decision::Allow(Grant::Relation(Relation::ResidenceCreator))
        );
        assert_eq!(
            can_access(&creator, &report, Operation::WRITE_STATUS),
            Decision::Deny
        );
    }

    #[test]
    fn test_plain_member_cannot_read_neighbours_issue_report() {
        let residence = ResidenceId::generate();
        let member = user(Role::User).with_approved_residences([residence]);
        let report = ResourceAttrs::new(ResourceKind::IssueReport)
            .with_owner(UserId::generate())
            .with_residence(residence);

        assert_eq!(can_access(&member, &report, Operation::Read), Decision::Deny);
    }

    #[test]
    fn test_caretaker_reads_reports_but_manager_sets_status() {
        let report = ResourceAttrs::new(ResourceKind::IssueReport)
            .with_owner(UserId::generate())
            .with_residence(ResidenceId::generate());

        assert!(can_access(&user(Role::Caretaker), &report, Operation::Read).is_allowed());
        assert_eq!(
            can_access(&user(Role::Caretaker), &report, Operation::WRITE_STATUS),
            Decision::Deny
        );
        assert!(can_access(&user(Role::Manager), &report, Operation::WRITE_STATUS).is_allowed());
    }

    #[test]
    fn test_membership_decided_by_residence_creator() {
        let creator = user(Role::User);
        let membership = ResourceAttrs::new(ResourceKind::Membership)
            .with_owner(UserId::generate())
            .with_residence(ResidenceId::generate())
            .with_residence_creators([creator.user_id]);

        assert!(can_access(&creator, &membership, Operation::WRITE_STATUS).is_allowed());
        assert_eq!(
            can_access(&user(Role::User), &membership, Operation::WRITE_STATUS),
            Decision::Deny
        );
    }

    #[test]
    fn test_member_cannot_decide_own_membership() {
        let member = user(Role::User);
        let membership = ResourceAttrs::new(ResourceKind::Membership)
            .with_owner(member.user_id)
            .with_residence(ResidenceId::generate());

        assert!(can_access(&member, &membership, Operation::Read).is_allowed());
        assert_eq!(
            can_access(&member, &membership, Operation::WRITE_STATUS),
            Decision::Deny
        );
    }

    #[test]
    fn test_any_subject_reads_residences() {
        let residence = ResourceAttrs::new(ResourceKind::Residence);
        assert!(can_access(&user(Role::User), &residence, Operation::Read).is_allowed());
        assert_eq!(
            can_access(&user(Role::Manager), &residence, Operation::WRITE_CONTENT),
            Decision::Deny
        );
    }

    #[test]
    fn test_issue_types_are_catalogue_data() {
        let issue_type = ResourceAttrs::new(ResourceKind::IssueType);
        assert!(can_access(&user(Role::User), &issue_type, Operation::Read).is_allowed());
        assert_eq!(
            can_access(&user(Role::Manager), &issue_type, Operation::WRITE_CONTENT),
            Decision::Deny
        );
        assert!(
            can_access(&user(Role::Admin), &issue_type, Operation::Delete).is_allowed()
        );
    }

    #[test]
    fn test_authorize_carries_operation_and_kind() {
        let news = news_in(ResidenceId::generate(), UserId::generate());
        let err = authorize(&user(Role::User), &news, Operation::Delete).unwrap_err();

        assert_eq!(err.operation, Operation::Delete);
        assert_eq!(err.kind, ResourceKind::News);
        assert_eq!(err.to_string(), "DELETE on news is not permitted");
    }

    #[test]
    fn test_every_pair_has_a_rule() {
        let kinds = [
            ResourceKind::Residence,
            ResourceKind::Membership,
            ResourceKind::News,
            ResourceKind::IssueType,
            ResourceKind::IssueReport,
            ResourceKind::Appointment,
        ];
        let operations = [
            Operation::Read,
            Operation::WRITE_CONTENT,
            Operation::WRITE_STATUS,
            Operation::Delete,
        ];
        for kind in kinds {
            for operation in operations {
                let rule = rule_for(kind, operation);
                if operation == Operation::Delete {
                    assert_eq!(rule.bypass, Role::ADMIN_TIER, "{kind} delete");
                }
                if !matches!(kind, ResourceKind::Residence | ResourceKind::IssueType) {
                    assert!(!rule.admits(Relation::Any), "{kind} {operation}");
                }
            }
        }
    }
}
