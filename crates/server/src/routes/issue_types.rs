//! Issue type route handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use residence_hub_core::models::IssueType;
use residence_hub_core::{IssueTypeId, PageRequest, Paginated};

use crate::error::{ApiResponse, AppError};
use crate::middleware::RequireSubject;
use crate::services::{CreateIssueType, UpdateIssueType};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct IssueTypeQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[instrument(skip(state, subject, input))]
pub async fn create(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    input: Result<Json<CreateIssueType>, JsonRejection>,
) -> Result<ApiResponse<IssueType>, AppError> {
    let Json(input) = input?;
    let issue_type = state.issue_types().create(&subject, input).await?;
    Ok(ApiResponse::created(issue_type))
}

#[instrument(skip(state, _subject))]
pub async fn list(
    State(state): State<AppState>,
    RequireSubject(_subject): RequireSubject,
    query: Result<Query<IssueTypeQuery>, QueryRejection>,
) -> Result<ApiResponse<Paginated<IssueType>>, AppError> {
    let Query(query) = query?;
    let page = PageRequest::from_query(query.page, query.limit)?;
    Ok(ApiResponse::ok(state.issue_types().list(page).await?))
}

#[instrument(skip(state, subject))]
pub async fn get(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<IssueTypeId>, PathRejection>,
) -> Result<ApiResponse<IssueType>, AppError> {
    let Path(id) = id?;
    Ok(ApiResponse::ok(state.issue_types().get(&subject, id).await?))
}

#[instrument(skip(state, subject, input))]
pub async fn update(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<IssueTypeId>, PathRejection>,
    input: Result<Json<UpdateIssueType>, JsonRejection>,
) -> Result<ApiResponse<IssueType>, AppError> {
    let Path(id) = id?;
    let Json(input) = input?;
    let issue_type = state.issue_types().update(&subject, id, input).await?;
    Ok(ApiResponse::ok(issue_type).with_message("Updated"))
}

#[instrument(skip(state, subject))]
pub async fn delete(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<IssueTypeId>, PathRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Path(id) = id?;
    state.issue_types().delete(&subject, id).await?;
    Ok(ApiResponse::ok(()).with_message("Deleted"))
}
