//! Row-level scope for list endpoints.
//!
//! A [`ScopePredicate`] is built once per request, before the store is
//! queried. An empty residence set always collapses to
//! [`ScopePredicate::Nothing`], so an empty `IN ()` can never be read as
//! "no filter".

use std::collections::BTreeSet;

use super::policy::{ResourceAttrs, SubjectAttrs};
use crate::types::{ResidenceId, Role, UserId};

/// Which rows a list query may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePredicate {
    /// Every row.
    Unrestricted,
    /// Rows whose residence is in the set. Never empty.
    Residences(BTreeSet<ResidenceId>),
    /// Rows the user owns or is the concerned party of.
    Party(UserId),
    /// No rows.
    Nothing,
}

impl ScopePredicate {
    /// Restrict to a set of residences, collapsing an empty set to
    /// [`ScopePredicate::Nothing`].
    #[must_use]
    pub fn residences(residences: impl IntoIterator<Item = ResidenceId>) -> Self {
        let set: BTreeSet<_> = residences.into_iter().collect();
        if set.is_empty() {
            Self::Nothing
        } else {
            Self::Residences(set)
        }
    }

    /// Returns true if the predicate can never match.
    #[must_use]
    pub const fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Evaluate the predicate against one resource.
    #[must_use]
    pub fn matches(&self, resource: &ResourceAttrs) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Residences(set) => resource
                .residence_id
                .is_some_and(|residence| set.contains(&residence)),
            Self::Party(user) => {
                resource.owner_id == Some(*user) || resource.concerned_id == Some(*user)
            }
            Self::Nothing => false,
        }
    }
}

/// Build the residence scope for `subject`, optionally narrowed to one
/// residence.
///
/// Elevated roles see every residence, or only `requested` when given. A
/// plain member sees the residences they are approved in; asking for any
/// other residence yields [`ScopePredicate::Nothing`].
#[must_use]
pub fn build_scope_predicate(
    subject: &SubjectAttrs,
    requested: Option<ResidenceId>,
) -> ScopePredicate {
    let predicate = match (subject.role.is_elevated(), requested) {
        (true, None) => ScopePredicate::Unrestricted,
        (true, Some(residence)) => ScopePredicate::residences([residence]),
        (false, None) => ScopePredicate::residences(subject.approved_residences.iter().copied()),
        (false, Some(residence)) if subject.is_member_of(residence) => {
            ScopePredicate::residences([residence])
        }
        (false, Some(_)) => ScopePredicate::Nothing,
    };
    tracing::debug!(user_id = %subject.user_id, ?predicate, "scope predicate");
    predicate
}

/// Build the party scope for `subject`: `bypass` roles see every row, anyone
/// else only rows they own or are concerned by.
#[must_use]
pub fn build_party_predicate(subject: &SubjectAttrs, bypass: &[Role]) -> ScopePredicate {
    if subject.role.is_one_of(bypass) {
        ScopePredicate::Unrestricted
    } else {
        ScopePredicate::Party(subject.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ResourceKind;

    fn scoped_to(residence: ResidenceId) -> ResourceAttrs {
        ResourceAttrs::new(ResourceKind::News)
            .with_owner(UserId::generate())
            .with_residence(residence)
    }

    #[test]
    fn test_member_without_approvals_sees_nothing() {
        let subject = SubjectAttrs::new(UserId::generate(), Role::User);
        let predicate = build_scope_predicate(&subject, None);

        assert_eq!(predicate, ScopePredicate::Nothing);
        assert!(!predicate.matches(&scoped_to(ResidenceId::generate())));
    }

    #[test]
    fn test_member_sees_only_approved_residences() {
        let approved = ResidenceId::generate();
        let other = ResidenceId::generate();
        let subject =
            SubjectAttrs::new(UserId::generate(), Role::User).with_approved_residences([approved]);
        let predicate = build_scope_predicate(&subject, None);

        assert!(predicate.matches(&scoped_to(approved)));
        assert!(!predicate.matches(&scoped_to(other)));
    }

    #[test]
    fn test_member_asking_for_foreign_residence_sees_nothing() {
        let approved = ResidenceId::generate();
        let subject =
            SubjectAttrs::new(UserId::generate(), Role::User).with_approved_residences([approved]);

        assert!(build_scope_predicate(&subject, Some(ResidenceId::generate())).is_nothing());
        assert_eq!(
            build_scope_predicate(&subject, Some(approved)),
            ScopePredicate::residences([approved])
        );
    }

    #[test]
    fn test_elevated_roles_are_unrestricted_or_narrowed() {
        let residence = ResidenceId::generate();
        for role in Role::ELEVATED {
            let subject = SubjectAttrs::new(UserId::generate(), *role);
            assert_eq!(
                build_scope_predicate(&subject, None),
                ScopePredicate::Unrestricted
            );
            let narrowed = build_scope_predicate(&subject, Some(residence));
            assert!(narrowed.matches(&scoped_to(residence)));
            assert!(!narrowed.matches(&scoped_to(ResidenceId::generate())));
        }
    }

    #[test]
    fn test_unscoped_resource_never_matches_residence_set() {
        let residence = ResidenceId::generate();
        let appointment = ResourceAttrs::new(ResourceKind::Appointment);
        assert!(!ScopePredicate::residences([residence]).matches(&appointment));
    }

    #[test]
    fn test_party_predicate() {
        let me = SubjectAttrs::new(UserId::generate(), Role::User);
        let predicate = build_party_predicate(&me, Role::ADMIN_TIER);

        let mine = ResourceAttrs::new(ResourceKind::Appointment)
            .with_owner(me.user_id)
            .with_concerned(UserId::generate());
        let concerning_me = ResourceAttrs::new(ResourceKind::Appointment)
            .with_owner(UserId::generate())
            .with_concerned(me.user_id);
        let unrelated = ResourceAttrs::new(ResourceKind::Appointment)
            .with_owner(UserId::generate())
            .with_concerned(UserId::generate());

        assert!(predicate.matches(&mine));
        assert!(predicate.matches(&concerning_me));
        assert!(!predicate.matches(&unrelated));

        let admin = SubjectAttrs::new(UserId::generate(), Role::Admin);
        assert_eq!(
            build_party_predicate(&admin, Role::ADMIN_TIER),
            ScopePredicate::Unrestricted
        );
    }
}
