//! Residence route handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use residence_hub_core::models::Residence;
use residence_hub_core::{PageRequest, Paginated, ResidenceId};

use crate::db::store::ResidenceFilter;
use crate::error::{ApiResponse, AppError};
use crate::middleware::RequireSubject;
use crate::services::{CreateResidence, UpdateResidence};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ResidenceQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[instrument(skip(state, subject, input))]
pub async fn create(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    input: Result<Json<CreateResidence>, JsonRejection>,
) -> Result<ApiResponse<Residence>, AppError> {
    let Json(input) = input?;
    let residence = state.residences().create(&subject, input).await?;
    Ok(ApiResponse::created(residence))
}

#[instrument(skip(state, _subject))]
pub async fn list(
    State(state): State<AppState>,
    RequireSubject(_subject): RequireSubject,
    query: Result<Query<ResidenceQuery>, QueryRejection>,
) -> Result<ApiResponse<Paginated<Residence>>, AppError> {
    let Query(query) = query?;
    let page = PageRequest::from_query(query.page, query.limit)?;
    let filter = ResidenceFilter {
        search: query.search,
        kind: query.kind,
        city: query.city,
        state: query.state,
        country: query.country,
    };
    Ok(ApiResponse::ok(state.residences().list(&filter, page).await?))
}

#[instrument(skip(state, subject))]
pub async fn get(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<ResidenceId>, PathRejection>,
) -> Result<ApiResponse<Residence>, AppError> {
    let Path(id) = id?;
    Ok(ApiResponse::ok(state.residences().get(&subject, id).await?))
}

#[instrument(skip(state, subject, input))]
pub async fn update(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<ResidenceId>, PathRejection>,
    input: Result<Json<UpdateResidence>, JsonRejection>,
) -> Result<ApiResponse<Residence>, AppError> {
    let Path(id) = id?;
    let Json(input) = input?;
    let residence = state.residences().update(&subject, id, input).await?;
    Ok(ApiResponse::ok(residence).with_message("Updated"))
}

#[instrument(skip(state, subject))]
pub async fn delete(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<ResidenceId>, PathRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Path(id) = id?;
    state.residences().delete(&subject, id).await?;
    Ok(ApiResponse::ok(()).with_message("Deleted"))
}
