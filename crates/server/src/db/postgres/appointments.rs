use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use residence_hub_core::models::Appointment;
use residence_hub_core::{
    AppointmentId, AppointmentStatus, PageRequest, Paginated, ResidenceId, UserId,
};

use super::{PgStore, ScopeColumns, fetch_count, push_page, push_scope};
use crate::db::RepositoryError;
use crate::db::store::{AppointmentChanges, AppointmentFilter, AppointmentStore, NewAppointment};

const APPOINTMENT_COLUMNS: &str = "id, owner_id, concerned_id, residence_id, title, note, \
     scheduled_at, status, created_at, updated_at";

const APPOINTMENT_SCOPE: ScopeColumns = ScopeColumns {
    residence: "residence_id",
    owner: "owner_id",
    concerned: Some("concerned_id"),
};

#[derive(Debug, sqlx::FromRow)]
struct AppointmentRow {
    id: AppointmentId,
    owner_id: UserId,
    concerned_id: UserId,
    residence_id: Option<ResidenceId>,
    title: String,
    note: Option<String>,
    scheduled_at: DateTime<Utc>,
    status: AppointmentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            concerned_id: row.concerned_id,
            residence_id: row.residence_id,
            title: row.title,
            note: row.note,
            scheduled_at: row.scheduled_at,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &AppointmentFilter) {
    push_scope(qb, &filter.scope, &APPOINTMENT_SCOPE);
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn create_appointment(
        &self,
        appointment: NewAppointment,
    ) -> Result<Appointment, RepositoryError> {
        let row = sqlx::query_as::<_, AppointmentRow>(&format!(
            "INSERT INTO appointments (id, owner_id, concerned_id, residence_id, title, note, scheduled_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {APPOINTMENT_COLUMNS}"
        ))
        .bind(AppointmentId::generate())
        .bind(appointment.owner_id)
        .bind(appointment.concerned_id)
        .bind(appointment.residence_id)
        .bind(&appointment.title)
        .bind(&appointment.note)
        .bind(appointment.scheduled_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, RepositoryError> {
        let row = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Paginated<Appointment>, RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM appointments WHERE TRUE");
        push_filters(&mut count, filter);
        let total = fetch_count(count, &self.pool).await?;

        let mut select = QueryBuilder::new(format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE TRUE"
        ));
        push_filters(&mut select, filter);
        select.push(" ORDER BY created_at DESC");
        push_page(&mut select, page);
        let rows: Vec<AppointmentRow> = select.build_query_as().fetch_all(&self.pool).await?;

        Ok(Paginated::new(
            page,
            total,
            rows.into_iter().map(Into::into).collect(),
        ))
    }

    async fn update_appointment(
        &self,
        id: AppointmentId,
        changes: AppointmentChanges,
    ) -> Result<Appointment, RepositoryError> {
        let row = sqlx::query_as::<_, AppointmentRow>(&format!(
            "UPDATE appointments SET
                title = COALESCE($2, title),
                note = COALESCE($3, note),
                scheduled_at = COALESCE($4, scheduled_at),
                status = COALESCE($5, status),
                updated_at = now()
             WHERE id = $1
             RETURNING {APPOINTMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.note)
        .bind(changes.scheduled_at)
        .bind(changes.status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete_appointment(&self, id: AppointmentId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
