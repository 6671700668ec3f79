//! Store ports.
//!
//! One trait per aggregate, all object safe so services can hold a
//! [`DynStore`]. Lookups return `Ok(None)` for a missing row; mutations of a
//! missing row return [`RepositoryError::NotFound`].

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use residence_hub_core::access::ScopePredicate;
use residence_hub_core::models::{
    Appointment, IssueReport, IssueType, Membership, MembershipDetail, News, Residence, User,
};
use residence_hub_core::{
    AppointmentId, AppointmentStatus, Email, IssueReportId, IssueStatus, IssueTypeId, JoinStatus,
    MembershipId, NewsId, PageRequest, Paginated, ResidenceId, Role, UserId,
};

use super::RepositoryError;

/// Shared handle to a store.
pub type DynStore = Arc<dyn Store>;

// =============================================================================
// Commands and filters
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub is_verified: bool,
}

#[derive(Debug, Clone)]
pub struct NewResidence {
    pub name: String,
    pub code: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub kind: Option<String>,
    pub creator_id: UserId,
}

/// Partial residence update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ResidenceChanges {
    pub name: Option<String>,
    pub code: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResidenceFilter {
    /// Case-insensitive match on name, code, street, city or state.
    pub search: Option<String>,
    pub kind: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MembershipFilter {
    pub residence_id: ResidenceId,
    pub status: JoinStatus,
    /// Case-insensitive match on the member's name or email.
    pub search: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewNews {
    pub author_id: UserId,
    pub residence_id: ResidenceId,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewsChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewIssueType {
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IssueTypeChanges {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewIssueReport {
    pub reporter_id: UserId,
    pub residence_id: ResidenceId,
    pub issue_type_id: Option<IssueTypeId>,
    pub description: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IssueReportChanges {
    pub issue_type_id: Option<IssueTypeId>,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

/// Status and assignment update. `assignee: Some(None)` clears the assignee.
#[derive(Debug, Clone, Default)]
pub struct IssueReportProgress {
    pub status: Option<IssueStatus>,
    pub assignee: Option<Option<UserId>>,
}

#[derive(Debug, Clone)]
pub struct IssueReportFilter {
    pub scope: ScopePredicate,
    pub residence_id: Option<ResidenceId>,
    pub status: Option<IssueStatus>,
    pub issue_type_id: Option<IssueTypeId>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub owner_id: UserId,
    pub concerned_id: UserId,
    pub residence_id: Option<ResidenceId>,
    pub title: String,
    pub note: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentChanges {
    pub title: Option<String>,
    pub note: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone)]
pub struct AppointmentFilter {
    pub scope: ScopePredicate,
    pub status: Option<AppointmentStatus>,
}

// =============================================================================
// Ports
// =============================================================================

#[async_trait]
pub trait UserStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError>;
}

#[async_trait]
pub trait ResidenceStore: Send + Sync {
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    async fn create_residence(&self, residence: NewResidence)
    -> Result<Residence, RepositoryError>;

    async fn get_residence(&self, id: ResidenceId) -> Result<Option<Residence>, RepositoryError>;

    /// Returns the residence holding `code`, if any.
    async fn get_residence_by_code(&self, code: &str)
    -> Result<Option<Residence>, RepositoryError>;

    async fn list_residences(
        &self,
        filter: &ResidenceFilter,
        page: PageRequest,
    ) -> Result<Paginated<Residence>, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the new code belongs to another
    /// residence.
    async fn update_residence(
        &self,
        id: ResidenceId,
        changes: ResidenceChanges,
    ) -> Result<Residence, RepositoryError>;

    async fn delete_residence(&self, id: ResidenceId) -> Result<(), RepositoryError>;

    /// Creators of the given residences, deduplicated.
    async fn creators_of(
        &self,
        residences: &BTreeSet<ResidenceId>,
    ) -> Result<Vec<UserId>, RepositoryError>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Insert a PENDING membership.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an active membership already
    /// exists for the pair.
    async fn create_membership(
        &self,
        user_id: UserId,
        residence_id: ResidenceId,
    ) -> Result<Membership, RepositoryError>;

    async fn get_membership(&self, id: MembershipId)
    -> Result<Option<Membership>, RepositoryError>;

    /// The non-rejected membership for the pair, if any.
    async fn find_active_membership(
        &self,
        user_id: UserId,
        residence_id: ResidenceId,
    ) -> Result<Option<Membership>, RepositoryError>;

    /// Memberships of one residence in one status, newest first.
    async fn list_memberships(
        &self,
        filter: &MembershipFilter,
        page: PageRequest,
    ) -> Result<Paginated<MembershipDetail>, RepositoryError>;

    /// Set the status if the stored version still equals `expected_version`,
    /// bumping the version.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a stale version and
    /// `RepositoryError::NotFound` if the membership is gone.
    async fn update_join_status(
        &self,
        id: MembershipId,
        status: JoinStatus,
        expected_version: i32,
    ) -> Result<Membership, RepositoryError>;

    /// Residences where the user holds an APPROVED membership.
    async fn approved_residences_of(
        &self,
        user_id: UserId,
    ) -> Result<BTreeSet<ResidenceId>, RepositoryError>;
}

#[async_trait]
pub trait NewsStore: Send + Sync {
    async fn create_news(&self, news: NewNews) -> Result<News, RepositoryError>;

    async fn get_news(&self, id: NewsId) -> Result<Option<News>, RepositoryError>;

    /// News matching `scope`, newest first.
    async fn list_news(
        &self,
        scope: &ScopePredicate,
        page: PageRequest,
    ) -> Result<Paginated<News>, RepositoryError>;

    async fn update_news(&self, id: NewsId, changes: NewsChanges) -> Result<News, RepositoryError>;

    async fn delete_news(&self, id: NewsId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait IssueTypeStore: Send + Sync {
    async fn create_issue_type(&self, issue_type: NewIssueType)
    -> Result<IssueType, RepositoryError>;

    async fn get_issue_type(&self, id: IssueTypeId) -> Result<Option<IssueType>, RepositoryError>;

    /// Issue types, newest first.
    async fn list_issue_types(
        &self,
        page: PageRequest,
    ) -> Result<Paginated<IssueType>, RepositoryError>;

    async fn update_issue_type(
        &self,
        id: IssueTypeId,
        changes: IssueTypeChanges,
    ) -> Result<IssueType, RepositoryError>;

    /// Reports filed under the type keep existing with no type.
    async fn delete_issue_type(&self, id: IssueTypeId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait IssueReportStore: Send + Sync {
    async fn create_issue_report(
        &self,
        report: NewIssueReport,
    ) -> Result<IssueReport, RepositoryError>;

    async fn get_issue_report(
        &self,
        id: IssueReportId,
    ) -> Result<Option<IssueReport>, RepositoryError>;

    async fn list_issue_reports(
        &self,
        filter: &IssueReportFilter,
        page: PageRequest,
    ) -> Result<Paginated<IssueReport>, RepositoryError>;

    async fn update_issue_report(
        &self,
        id: IssueReportId,
        changes: IssueReportChanges,
    ) -> Result<IssueReport, RepositoryError>;

    async fn update_issue_report_progress(
        &self,
        id: IssueReportId,
        progress: IssueReportProgress,
    ) -> Result<IssueReport, RepositoryError>;

    async fn delete_issue_report(&self, id: IssueReportId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepositoryError>;

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError>;

    /// Appointments matching the filter, newest first.
    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Paginated<Appointment>, RepositoryError>;

    async fn update_appointment(
        &self,
        id: AppointmentId,
        changes: AppointmentChanges,
    ) -> Result<Appointment, RepositoryError>;

    async fn delete_appointment(&self, id: AppointmentId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Every port in one object.
pub trait Store:
    UserStore
    + ResidenceStore
    + MembershipStore
    + NewsStore
    + IssueTypeStore
    + IssueReportStore
    + AppointmentStore
    + StoreHealth
{
}

impl<T> Store for T where
    T: UserStore
        + ResidenceStore
        + MembershipStore
        + NewsStore
        + IssueTypeStore
        + IssueReportStore
        + AppointmentStore
        + StoreHealth
{
}
