//! Issue report route handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use residence_hub_core::models::IssueReport;
use residence_hub_core::{
    IssueReportId, IssueStatus, IssueTypeId, PageRequest, Paginated, ResidenceId,
};

use crate::error::{ApiResponse, AppError};
use crate::middleware::RequireSubject;
use crate::services::{
    CreateIssueReport, IssueReportQuery, IssueReportView, UpdateIssueReport, UpdateIssueStatus,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReportListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub residence_id: Option<ResidenceId>,
    pub status: Option<IssueStatus>,
    pub issue_type_id: Option<IssueTypeId>,
}

#[instrument(skip(state, subject, input))]
pub async fn create(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    input: Result<Json<CreateIssueReport>, JsonRejection>,
) -> Result<ApiResponse<IssueReport>, AppError> {
    let Json(input) = input?;
    let report = state.issue_reports().create(&subject, input).await?;
    Ok(ApiResponse::created(report))
}

#[instrument(skip(state, subject))]
pub async fn list(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    query: Result<Query<IssueReportListQuery>, QueryRejection>,
) -> Result<ApiResponse<Paginated<IssueReport>>, AppError> {
    let Query(query) = query?;
    let page = PageRequest::from_query(query.page, query.limit)?;
    let filter = IssueReportQuery {
        residence_id: query.residence_id,
        status: query.status,
        issue_type_id: query.issue_type_id,
    };
    let reports = state.issue_reports().list(&subject, filter, page).await?;
    Ok(ApiResponse::ok(reports))
}

#[instrument(skip(state, subject))]
pub async fn get(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<IssueReportId>, PathRejection>,
) -> Result<ApiResponse<IssueReportView>, AppError> {
    let Path(id) = id?;
    Ok(ApiResponse::ok(state.issue_reports().get(&subject, id).await?))
}

#[instrument(skip(state, subject, input))]
pub async fn update(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<IssueReportId>, PathRejection>,
    input: Result<Json<UpdateIssueReport>, JsonRejection>,
) -> Result<ApiResponse<IssueReport>, AppError> {
    let Path(id) = id?;
    let Json(input) = input?;
    let report = state.issue_reports().update(&subject, id, input).await?;
    Ok(ApiResponse::ok(report).with_message("Updated"))
}

#[instrument(skip(state, subject, input))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<IssueReportId>, PathRejection>,
    input: Result<Json<UpdateIssueStatus>, JsonRejection>,
) -> Result<ApiResponse<IssueReport>, AppError> {
    let Path(id) = id?;
    let Json(input) = input?;
    let report = state
        .issue_reports()
        .update_status(&subject, id, input)
        .await?;
    Ok(ApiResponse::ok(report).with_message("Status updated"))
}

#[instrument(skip(state, subject))]
pub async fn delete(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<IssueReportId>, PathRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Path(id) = id?;
    state.issue_reports().delete(&subject, id).await?;
    Ok(ApiResponse::ok(()).with_message("Deleted"))
}
