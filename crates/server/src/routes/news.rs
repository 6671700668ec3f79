//! News route handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use residence_hub_core::models::News;
use residence_hub_core::{NewsId, PageRequest, Paginated, ResidenceId};

use crate::error::{ApiResponse, AppError};
use crate::middleware::RequireSubject;
use crate::services::{CreateNews, UpdateNews};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub residence_id: Option<ResidenceId>,
}

#[instrument(skip(state, subject, input))]
pub async fn create(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    input: Result<Json<CreateNews>, JsonRejection>,
) -> Result<ApiResponse<News>, AppError> {
    let Json(input) = input?;
    Ok(ApiResponse::created(state.news().create(&subject, input).await?))
}

#[instrument(skip(state, subject))]
pub async fn list(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Result<ApiResponse<Paginated<News>>, AppError> {
    let Query(query) = query?;
    let page = PageRequest::from_query(query.page, query.limit)?;
    let news = state.news().list(&subject, query.residence_id, page).await?;
    Ok(ApiResponse::ok(news))
}

#[instrument(skip(state, subject))]
pub async fn list_for_residence(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    residence_id: Result<Path<ResidenceId>, PathRejection>,
    query: Result<Query<NewsQuery>, QueryRejection>,
) -> Result<ApiResponse<Paginated<News>>, AppError> {
    let Path(residence_id) = residence_id?;
    let Query(query) = query?;
    let page = PageRequest::from_query(query.page, query.limit)?;
    let news = state.news().list(&subject, Some(residence_id), page).await?;
    Ok(ApiResponse::ok(news))
}

#[instrument(skip(state, subject))]
pub async fn get(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<NewsId>, PathRejection>,
) -> Result<ApiResponse<News>, AppError> {
    let Path(id) = id?;
    Ok(ApiResponse::ok(state.news().get(&subject, id).await?))
}

#[instrument(skip(state, subject, input))]
pub async fn update(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<NewsId>, PathRejection>,
    input: Result<Json<UpdateNews>, JsonRejection>,
) -> Result<ApiResponse<News>, AppError> {
    let Path(id) = id?;
    let Json(input) = input?;
    let news = state.news().update(&subject, id, input).await?;
    Ok(ApiResponse::ok(news).with_message("Updated"))
}

#[instrument(skip(state, subject))]
pub async fn delete(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<NewsId>, PathRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Path(id) = id?;
    state.news().delete(&subject, id).await?;
    Ok(ApiResponse::ok(()).with_message("Deleted"))
}
