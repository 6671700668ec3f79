//! Domain models shared by the server, CLI and tests.
//!
//! Each residence-scoped model exposes an `attrs()` view consumed by
//! [`crate::access`].

mod appointment;
mod issue_report;
mod issue_type;
mod membership;
mod news;
mod residence;
mod user;

pub use appointment::Appointment;
pub use issue_report::IssueReport;
pub use issue_type::IssueType;
pub use membership::{Membership, MembershipDetail};
pub use news::News;
pub use residence::Residence;
pub use user::{User, UserSummary};
