//! In-memory store.
//!
//! Keeps every table in a `Vec` behind one `tokio` read-write lock. It
//! enforces the same constraints as the `PostgreSQL` schema: unique emails,
//! unique residence codes, one active membership per (user, residence), and
//! versioned membership decisions.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use residence_hub_core::access::ScopePredicate;
use residence_hub_core::models::{
    Appointment, IssueReport, IssueType, Membership, MembershipDetail, News, Residence, User,
    UserSummary,
};
use residence_hub_core::{
    AppointmentId, AppointmentStatus, Email, IssueReportId, IssueStatus, IssueTypeId, JoinStatus,
    MembershipId, NewsId, PageRequest, Paginated, ResidenceId, Role, UserId, matches_search,
};

use super::RepositoryError;
use super::store::{
    AppointmentChanges, AppointmentFilter, AppointmentStore, IssueReportChanges,
    IssueReportFilter, IssueReportProgress, IssueReportStore, IssueTypeChanges, IssueTypeStore,
    MembershipFilter, MembershipStore, NewAppointment, NewIssueReport, NewIssueType, NewNews,
    NewResidence, NewUser, NewsChanges, NewsStore, ResidenceChanges, ResidenceFilter, ResidenceStore, StoreHealth, UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    residences: Vec<Residence>,
    memberships: Vec<Membership>,
    news: Vec<News>,
    issue_types: Vec<IssueType>,
    issue_reports: Vec<IssueReport>,
    appointments: Vec<Appointment>,
}

/// Store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Remove the row matching `pred`, or fail with `NotFound`.
fn remove_where<T>(rows: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> Result<(), RepositoryError> {
    let before = rows.len();
    rows.retain(|row| !pred(row));
    if rows.len() == before {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

fn replace_if_some<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_if_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn eq_opt(filter: Option<&String>, value: Option<&String>) -> bool {
    filter.is_none_or(|wanted| value == Some(wanted))
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            name: user.name,
            email: user.email,
            role: user.role,
            is_verified: user.is_verified,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn set_user_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(RepositoryError::NotFound)?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl ResidenceStore for InMemoryStore {
    async fn create_residence(
        &self,
        residence: NewResidence,
    ) -> Result<Residence, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.residences.iter().any(|r| r.code == residence.code) {
            return Err(RepositoryError::Conflict(
                "residence code already exists".to_owned(),
            ));
        }

        let now = Utc::now();
        let residence = Residence {
            id: ResidenceId::generate(),
            name: residence.name,
            code: residence.code,
            street: residence.street,
            city: residence.city,
            state: residence.state,
            country: residence.country,
            kind: residence.kind,
            creator_id: residence.creator_id,
            created_at: now,
            updated_at: now,
        };
        tables.residences.push(residence.clone());
        Ok(residence)
    }

    async fn get_residence(&self, id: ResidenceId) -> Result<Option<Residence>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.residences.iter().find(|r| r.id == id).cloned())
    }

    async fn get_residence_by_code(
        &self,
        code: &str,
    ) -> Result<Option<Residence>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.residences.iter().find(|r| r.code == code).cloned())
    }

    async fn list_residences(
        &self,
        filter: &ResidenceFilter,
        page: PageRequest,
    ) -> Result<Paginated<Residence>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Residence> = tables
            .residences
            .iter()
            .filter(|r| {
                matches_search(
                    filter.search.as_deref(),
                    [
                        Some(r.name.as_str()),
                        Some(r.code.as_str()),
                        r.street.as_deref(),
                        r.city.as_deref(),
                        r.state.as_deref(),
                    ]
                    .into_iter()
                    .flatten(),
                )
            })
            .filter(|r| eq_opt(filter.kind.as_ref(), r.kind.as_ref()))
            .filter(|r| matches_search(filter.city.as_deref(), r.city.as_deref()))
            .filter(|r| matches_search(filter.state.as_deref(), r.state.as_deref()))
            .filter(|r| matches_search(filter.country.as_deref(), r.country.as_deref()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Paginated::from_vec(page, rows))
    }

    async fn update_residence(
        &self,
        id: ResidenceId,
        changes: ResidenceChanges,
    ) -> Result<Residence, RepositoryError> {
        let mut tables = self.tables.write().await;
        if let Some(code) = &changes.code
            && tables
                .residences
                .iter()
                .any(|r| r.id != id && &r.code == code)
        {
            return Err(RepositoryError::Conflict(
                "residence code already exists".to_owned(),
            ));
        }

        let residence = tables
            .residences
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound)?;
        replace_if_some(&mut residence.name, changes.name);
        replace_if_some(&mut residence.code, changes.code);
        set_if_some(&mut residence.street, changes.street);
        set_if_some(&mut residence.city, changes.city);
        set_if_some(&mut residence.state, changes.state);
        set_if_some(&mut residence.country, changes.country);
        set_if_some(&mut residence.kind, changes.kind);
        residence.updated_at = Utc::now();
        Ok(residence.clone())
    }

    async fn delete_residence(&self, id: ResidenceId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.residences, |r| r.id == id)?;
        // Mirror the ON DELETE behaviour of the schema.
        tables.memberships.retain(|m| m.residence_id != id);
        tables.news.retain(|n| n.residence_id != id);
        tables.issue_reports.retain(|r| r.residence_id != id);
        for appointment in &mut tables.appointments {
            if appointment.residence_id == Some(id) {
                appointment.residence_id = None;
            }
        }
        Ok(())
    }

    async fn creators_of(
        &self,
        residences: &BTreeSet<ResidenceId>,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let tables = self.tables.read().await;
        let creators: BTreeSet<UserId> = tables
            .residences
            .iter()
            .filter(|r| residences.contains(&r.id))
            .map(|r| r.creator_id)
            .collect();
        Ok(creators.into_iter().collect())
    }
}

#[async_trait]
impl MembershipStore for InMemoryStore {
    async fn create_membership(
        &self,
        user_id: UserId,
        residence_id: ResidenceId,
    ) -> Result<Membership, RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.memberships.iter().any(|m| {
            m.user_id == user_id && m.residence_id == residence_id && m.join_status.is_active()
        }) {
            return Err(RepositoryError::Conflict(
                "an active membership already exists".to_owned(),
            ));
        }

        let now = Utc::now();
        let membership = Membership {
            id: MembershipId::generate(),
            user_id,
            residence_id,
            join_status: JoinStatus::Pending,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        tables.memberships.push(membership.clone());
        Ok(membership)
    }

    async fn get_membership(
        &self,
        id: MembershipId,
    ) -> Result<Option<Membership>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.memberships.iter().find(|m| m.id == id).cloned())
    }

    async fn find_active_membership(
        &self,
        user_id: UserId,
        residence_id: ResidenceId,
    ) -> Result<Option<Membership>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .find(|m| {
                m.user_id == user_id && m.residence_id == residence_id && m.join_status.is_active()
            })
            .cloned())
    }

    async fn list_memberships(
        &self,
        filter: &MembershipFilter,
        page: PageRequest,
    ) -> Result<Paginated<MembershipDetail>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<MembershipDetail> = tables
            .memberships
            .iter()
            .filter(|m| m.residence_id == filter.residence_id && m.join_status == filter.status)
            .filter_map(|m| {
                let user = tables.users.iter().find(|u| u.id == m.user_id)?;
                matches_search(
                    filter.search.as_deref(),
                    [user.name.as_str(), user.email.as_str()],
                )
                .then(|| MembershipDetail {
                    membership: m.clone(),
                    user: UserSummary::from(user),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.membership.created_at.cmp(&a.membership.created_at));
        Ok(Paginated::from_vec(page, rows))
    }

    async fn update_join_status(
        &self,
        id: MembershipId,
        status: JoinStatus,
        expected_version: i32,
    ) -> Result<Membership, RepositoryError> {
        let mut tables = self.tables.write().await;
        let membership = tables
            .memberships
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if membership.version != expected_version {
            return Err(RepositoryError::Conflict(
                "membership was modified concurrently".to_owned(),
            ));
        }

        membership.join_status = status;
        membership.version += 1;
        membership.updated_at = Utc::now();
        Ok(membership.clone())
    }

    async fn approved_residences_of(
        &self,
        user_id: UserId,
    ) -> Result<BTreeSet<ResidenceId>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.join_status == JoinStatus::Approved)
            .map(|m| m.residence_id)
            .collect())
    }
}

#[async_trait]
impl NewsStore for InMemoryStore {
    async fn create_news(&self, news: NewNews) -> Result<News, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let news = News {
            id: NewsId::generate(),
            author_id: news.author_id,
            residence_id: news.residence_id,
            title: news.title,
            content: news.content,
            image_url: news.image_url,
            created_at: now,
            updated_at: now,
        };
        tables.news.push(news.clone());
        Ok(news)
    }

    async fn get_news(&self, id: NewsId) -> Result<Option<News>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.news.iter().find(|n| n.id == id).cloned())
    }

    async fn list_news(
        &self,
        scope: &ScopePredicate,
        page: PageRequest,
    ) -> Result<Paginated<News>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<News> = tables
            .news
            .iter()
            .filter(|n| scope.matches(&n.attrs()))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Paginated::from_vec(page, rows))
    }

    async fn update_news(&self, id: NewsId, changes: NewsChanges) -> Result<News, RepositoryError> {
        let mut tables = self.tables.write().await;
        let news = tables
            .news
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(RepositoryError::NotFound)?;
        replace_if_some(&mut news.title, changes.title);
        replace_if_some(&mut news.content, changes.content);
        set_if_some(&mut news.image_url, changes.image_url);
        news.updated_at = Utc::now();
        Ok(news.clone())
    }

    async fn delete_news(&self, id: NewsId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.news, |n| n.id == id)
    }
}

#[async_trait]
impl IssueTypeStore for InMemoryStore {
    async fn create_issue_type(
        &self,
        issue_type: NewIssueType,
    ) -> Result<IssueType, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let issue_type = IssueType {
            id: IssueTypeId::generate(),
            name: issue_type.name,
            image_url: issue_type.image_url,
            created_at: now,
            updated_at: now,
        };
        tables.issue_types.push(issue_type.clone());
        Ok(issue_type)
    }

    async fn get_issue_type(&self, id: IssueTypeId) -> Result<Option<IssueType>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.issue_types.iter().find(|t| t.id == id).cloned())
    }

    async fn list_issue_types(
        &self,
        page: PageRequest,
    ) -> Result<Paginated<IssueType>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows = tables.issue_types.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Paginated::from_vec(page, rows))
    }

    async fn update_issue_type(
        &self,
        id: IssueTypeId,
        changes: IssueTypeChanges,
    ) -> Result<IssueType, RepositoryError> {
        let mut tables = self.tables.write().await;
        let issue_type = tables
            .issue_types
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(RepositoryError::NotFound)?;
        replace_if_some(&mut issue_type.name, changes.name);
        set_if_some(&mut issue_type.image_url, changes.image_url);
        issue_type.updated_at = Utc::now();
        Ok(issue_type.clone())
    }

    async fn delete_issue_type(&self, id: IssueTypeId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.issue_types, |t| t.id == id)?;
        for report in &mut tables.issue_reports {
            if report.issue_type_id == Some(id) {
                report.issue_type_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl IssueReportStore for InMemoryStore {
    async fn create_issue_report(
        &self,
        report: NewIssueReport,
    ) -> Result<IssueReport, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let report = IssueReport {
            id: IssueReportId::generate(),
            reporter_id: report.reporter_id,
            residence_id: report.residence_id,
            issue_type_id: report.issue_type_id,
            description: report.description,
            image_urls: report.image_urls,
            status: IssueStatus::Pending,
            assignee_id: None,
            created_at: now,
            updated_at: now,
        };
        tables.issue_reports.push(report.clone());
        Ok(report)
    }

    async fn get_issue_report(
        &self,
        id: IssueReportId,
    ) -> Result<Option<IssueReport>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.issue_reports.iter().find(|r| r.id == id).cloned())
    }

    async fn list_issue_reports(
        &self,
        filter: &IssueReportFilter,
        page: PageRequest,
    ) -> Result<Paginated<IssueReport>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<IssueReport> = tables
            .issue_reports
            .iter()
            .filter(|r| filter.scope.matches(&r.attrs()))
            .filter(|r| filter.residence_id.is_none_or(|id| r.residence_id == id))
            .filter(|r| filter.status.is_none_or(|status| r.status == status))
            .filter(|r| {
                filter
                    .issue_type_id
                    .is_none_or(|id| r.issue_type_id == Some(id))
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Paginated::from_vec(page, rows))
    }

    async fn update_issue_report(
        &self,
        id: IssueReportId,
        changes: IssueReportChanges,
    ) -> Result<IssueReport, RepositoryError> {
        let mut tables = self.tables.write().await;
        let report = tables
            .issue_reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound)?;
        set_if_some(&mut report.issue_type_id, changes.issue_type_id);
        replace_if_some(&mut report.description, changes.description);
        replace_if_some(&mut report.image_urls, changes.image_urls);
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    async fn update_issue_report_progress(
        &self,
        id: IssueReportId,
        progress: IssueReportProgress,
    ) -> Result<IssueReport, RepositoryError> {
        let mut tables = self.tables.write().await;
        let report = tables
            .issue_reports
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound)?;
        replace_if_some(&mut report.status, progress.status);
        replace_if_some(&mut report.assignee_id, progress.assignee);
        report.updated_at = Utc::now();
        Ok(report.clone())
    }

    async fn delete_issue_report(&self, id: IssueReportId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.issue_reports, |r| r.id == id)
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepositoryError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let appointment = Appointment {
            id: AppointmentId::generate(),
            owner_id: appointment.owner_id,
            concerned_id: appointment.concerned_id,
            residence_id: appointment.residence_id,
            title: appointment.title,
            note: appointment.note,
            scheduled_at: appointment.scheduled_at,
            status: AppointmentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Paginated<Appointment>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Appointment> = tables
            .appointments
            .iter()
            .filter(|a| filter.scope.matches(&a.attrs()))
            .filter(|a| filter.status.is_none_or(|status| a.status == status))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Paginated::from_vec(page, rows))
    }

    async fn update_appointment(
        &self,
        id: AppointmentId,
        changes: AppointmentChanges,
    ) -> Result<Appointment, RepositoryError> {
        let mut tables = self.tables.write().await;
        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(RepositoryError::NotFound)?;
        replace_if_some(&mut appointment.title, changes.title);
        set_if_some(&mut appointment.note, changes.note);
        replace_if_some(&mut appointment.scheduled_at, changes.scheduled_at);
        replace_if_some(&mut appointment.status, changes.status);
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn delete_appointment(&self, id: AppointmentId) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        remove_where(&mut tables.appointments, |a| a.id == id)
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
