//! Scoped authorization.
//!
//! - [`policy`] - the declarative rule table and [`can_access`]
//! - [`scope`] - list predicates built from a subject's approved residences

pub mod policy;
pub mod scope;

pub use policy::{
    AccessDenied, Decision, Grant, Operation, Relation, ResourceAttrs, ResourceKind, Rule,
    SubjectAttrs, WriteKind, authorize, can_access, rule_for,
};
pub use scope::{ScopePredicate, build_party_predicate, build_scope_predicate};
