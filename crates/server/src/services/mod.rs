//! Business logic services.
//!
//! # Services
//!
//! - `guard` - Binds the access policy to the store
//! - `membership` - Join requests and decisions
//! - `residences` - Residence CRUD
//! - `news` - Residence-scoped news
//! - `issue_types` - Catalogue of report categories
//! - `issue_reports` - Maintenance reports with a derived timeline
//! - `appointments` - Appointments between an owner and a concerned user
//!
//! Every service checks existence before permission, so a missing resource
//! is reported as not found even to subjects who could not see it.

pub mod appointments;
pub mod guard;
pub mod issue_reports;
pub mod issue_types;
pub mod membership;
pub mod news;
pub mod residences;

pub use appointments::{AppointmentService, CreateAppointment, UpdateAppointment};
pub use guard::AccessGuard;
pub use issue_reports::{
    CreateIssueReport, IssueReportQuery, IssueReportService, IssueReportView, UpdateIssueReport,
    UpdateIssueStatus,
};
pub use issue_types::{CreateIssueType, IssueTypeService, UpdateIssueType};
pub use membership::{Decide, MembershipWorkflow};
pub use news::{CreateNews, NewsService, UpdateNews};
pub use residences::{CreateResidence, ResidenceService, UpdateResidence};

use crate::error::AppError;

/// Trim `value`, rejecting it when nothing is left.
pub(crate) fn non_blank(field: &str, value: String) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be blank")));
    }
    if trimmed.len() == value.len() {
        Ok(value)
    } else {
        Ok(trimmed.to_owned())
    }
}
