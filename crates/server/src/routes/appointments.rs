//! Appointment route handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use residence_hub_core::models::Appointment;
use residence_hub_core::{AppointmentId, AppointmentStatus, PageRequest, Paginated};

use crate::error::{ApiResponse, AppError};
use crate::middleware::RequireSubject;
use crate::services::{CreateAppointment, UpdateAppointment};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<AppointmentStatus>,
}

#[instrument(skip(state, subject, input))]
pub async fn create(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    input: Result<Json<CreateAppointment>, JsonRejection>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let Json(input) = input?;
    let appointment = state.appointments().create(&subject, input).await?;
    Ok(ApiResponse::created(appointment))
}

#[instrument(skip(state, subject))]
pub async fn list(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    query: Result<Query<AppointmentQuery>, QueryRejection>,
) -> Result<ApiResponse<Paginated<Appointment>>, AppError> {
    let Query(query) = query?;
    let page = PageRequest::from_query(query.page, query.limit)?;
    let appointments = state
        .appointments()
        .list(&subject, query.status, page)
        .await?;
    Ok(ApiResponse::ok(appointments))
}

#[instrument(skip(state, subject))]
pub async fn get(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<AppointmentId>, PathRejection>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let Path(id) = id?;
    Ok(ApiResponse::ok(state.appointments().get(&subject, id).await?))
}

#[instrument(skip(state, subject, input))]
pub async fn update(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<AppointmentId>, PathRejection>,
    input: Result<Json<UpdateAppointment>, JsonRejection>,
) -> Result<ApiResponse<Appointment>, AppError> {
    let Path(id) = id?;
    let Json(input) = input?;
    let appointment = state.appointments().update(&subject, id, input).await?;
    Ok(ApiResponse::ok(appointment).with_message("Updated"))
}

#[instrument(skip(state, subject))]
pub async fn delete(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<AppointmentId>, PathRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Path(id) = id?;
    state.appointments().delete(&subject, id).await?;
    Ok(ApiResponse::ok(()).with_message("Deleted"))
}
