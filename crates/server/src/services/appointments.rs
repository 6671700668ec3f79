//! Appointments between two users.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};

use residence_hub_core::access::{Operation, SubjectAttrs, build_party_predicate};
use residence_hub_core::models::Appointment;
use residence_hub_core::{AppointmentId, AppointmentStatus, PageRequest, Paginated, ResidenceId, Role, UserId};

use crate::db::store::{AppointmentChanges, AppointmentFilter, NewAppointment};
use crate::db::{AppointmentStore, DynStore, ResidenceStore, UserStore};
use crate::error::AppError;
use crate::services::{AccessGuard, non_blank};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointment {
    pub concerned_id: UserId,
    pub residence_id: Option<ResidenceId>,
    pub title: String,
    pub note: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointment {
    pub title: Option<String>,
    pub note: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
}

pub struct AppointmentService {
    store: DynStore,
    guard: AccessGuard,
}

impl AppointmentService {
    #[must_use]
    pub fn new(store: DynStore) -> Self {
        Self {
            guard: AccessGuard::new(store.clone()),
            store,
        }
    }

    async fn fetch(&self, id: AppointmentId) -> Result<Appointment, AppError> {
        self.store
            .get_appointment(id)
            .await?
            .ok_or_else(|| AppError::not_found("appointment"))
    }

    /// Book an appointment owned by the subject.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the concerned user or the residence does not exist
    /// - `BadRequest` for a blank title
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id, concerned_id = %input.concerned_id))]
    pub async fn create(
        &self,
        subject: &SubjectAttrs,
        input: CreateAppointment,
    ) -> Result<Appointment, AppError> {
        if self.store.get_user(input.concerned_id).await?.is_none() {
            return Err(AppError::not_found("concerned user"));
        }
        if let Some(residence_id) = input.residence_id
            && self.store.get_residence(residence_id).await?.is_none()
        {
            return Err(AppError::not_found("residence"));
        }

        let appointment = self
            .store
            .create_appointment(NewAppointment {
                owner_id: subject.user_id,
                concerned_id: input.concerned_id,
                residence_id: input.residence_id,
                title: non_blank("title", input.title)?,
                note: input.note,
                scheduled_at: input.scheduled_at,
            })
            .await?;
        info!(appointment_id = %appointment.id, "Appointment booked");
        Ok(appointment)
    }

    /// Appointments the subject owns or is concerned by, most recently booked
    /// first.
    /// The admin tier sees all of them.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn list(
        &self,
        subject: &SubjectAttrs,
        status: Option<AppointmentStatus>,
        page: PageRequest,
    ) -> Result<Paginated<Appointment>, AppError> {
        let filter = AppointmentFilter {
            scope: build_party_predicate(subject, Role::ADMIN_TIER),
            status,
        };
        Ok(self.store.list_appointments(&filter, page).await?)
    }

    /// # Errors
    ///
    /// - `NotFound` if the appointment does not exist
    /// - `Forbidden` unless owner, concerned party, or admin tier
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn get(
        &self,
        subject: &SubjectAttrs,
        id: AppointmentId,
    ) -> Result<Appointment, AppError> {
        let appointment = self.fetch(id).await?;
        self.guard
            .check(subject, &appointment.attrs(), Operation::Read)?;
        Ok(appointment)
    }

    /// Confirm, reschedule, or otherwise update an appointment.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the appointment does not exist
    /// - `Forbidden` unless concerned party or admin tier
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id))]
    pub async fn update(
        &self,
        subject: &SubjectAttrs,
        id: AppointmentId,
        input: UpdateAppointment,
    ) -> Result<Appointment, AppError> {
        let appointment = self.fetch(id).await?;
        self.guard
            .check(subject, &appointment.attrs(), Operation::WRITE_STATUS)?;

        let changes = AppointmentChanges {
            title: input.title.map(|t| non_blank("title", t)).transpose()?,
            note: input.note,
            scheduled_at: input.scheduled_at,
            status: input.status,
        };
        let updated = self.store.update_appointment(id, changes).await?;
        info!(appointment_id = %id, status = ?updated.status, "Appointment updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// - `NotFound` if the appointment does not exist
    /// - `Forbidden` below the admin tier
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn delete(&self, subject: &SubjectAttrs, id: AppointmentId) -> Result<(), AppError> {
        let appointment = self.fetch(id).await?;
        self.guard
            .check(subject, &appointment.attrs(), Operation::Delete)?;
        self.store.delete_appointment(id).await?;
        info!(appointment_id = %id, "Appointment deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use residence_hub_core::Email;

    use super::*;
    use crate::db::InMemoryStore;
    use crate::db::store::NewUser;

    async fn setup() -> (AppointmentService, SubjectAttrs, SubjectAttrs) {
        let store = Arc::new(InMemoryStore::new());
        let mut subjects = Vec::new();
        for name in ["olga", "cyrus"] {
            let user = store
                .create_user(NewUser {
                    name: name.to_owned(),
                    email: Email::parse(&format!("{name}@example.com")).unwrap(),
                    role: Role::User,
                    is_verified: true,
                })
                .await
                .unwrap();
            subjects.push(SubjectAttrs::new(user.id, Role::User));
        }
        let concerned = subjects.pop().unwrap();
        let owner = subjects.pop().unwrap();
        (AppointmentService::new(store), owner, concerned)
    }

    fn booking(concerned: UserId, in_hours: i64) -> CreateAppointment {
        CreateAppointment {
            concerned_id: concerned,
            residence_id: None,
            title: "Viewing".to_owned(),
            note: None,
            scheduled_at: Utc::now() + Duration::hours(in_hours),
        }
    }

    #[tokio::test]
    async fn test_only_concerned_party_confirms() {
        let (service, owner, concerned) = setup().await;
        let appointment = service
            .create(&owner, booking(concerned.user_id, 24))
            .await
            .unwrap();
        let confirm = UpdateAppointment {
            status: Some(AppointmentStatus::Confirmed),
            ..UpdateAppointment::default()
        };

        let err = service
            .update(&owner, appointment.id, confirm.clone())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");

        let updated = service
            .update(&concerned, appointment.id, confirm)
            .await
            .unwrap();
        assert_eq!(updated.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_outsider_cannot_read() {
        let (service, owner, concerned) = setup().await;
        let appointment = service
            .create(&owner, booking(concerned.user_id, 1))
            .await
            .unwrap();
        let outsider = SubjectAttrs::new(UserId::generate(), Role::Manager);
        let err = service.get(&outsider, appointment.id).await.unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_list_is_party_scoped_and_newest_booking_first() {
        let (service, owner, concerned) = setup().await;
        let sooner = service
            .create(&owner, booking(concerned.user_id, 2))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let later = service
            .create(&owner, booking(concerned.user_id, 48))
            .await
            .unwrap();

        // Booking order, not schedule order.
        let page = service
            .list(&concerned, None, PageRequest::default())
            .await
            .unwrap();
        let ids: Vec<_> = page.data.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![later.id, sooner.id]);

        let outsider = SubjectAttrs::new(UserId::generate(), Role::User);
        let none = service
            .list(&outsider, None, PageRequest::default())
            .await
            .unwrap();
        assert!(none.data.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_concerned_user() {
        let (service, owner, _) = setup().await;
        let err = service
            .create(&owner, booking(UserId::generate(), 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NOT_FOUND");
    }
}
