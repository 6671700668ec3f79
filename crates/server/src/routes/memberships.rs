//! Membership route handlers.

use std::collections::BTreeSet;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::instrument;

use residence_hub_core::models::{Membership, MembershipDetail};
use residence_hub_core::{JoinStatus, MembershipId, PageRequest, Paginated, ResidenceId};

use crate::error::{ApiResponse, AppError};
use crate::middleware::RequireSubject;
use crate::services::Decide;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MembershipQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<JoinStatus>,
}

#[instrument(skip(state, subject))]
pub async fn request_join(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    residence_id: Result<Path<ResidenceId>, PathRejection>,
) -> Result<ApiResponse<Membership>, AppError> {
    let Path(residence_id) = residence_id?;
    let membership = state
        .memberships()
        .request_join(subject.user_id, residence_id)
        .await?;
    Ok(ApiResponse::created(membership).with_message("Join request submitted"))
}

#[instrument(skip(state, subject))]
pub async fn list_pending(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    residence_id: Result<Path<ResidenceId>, PathRejection>,
    query: Result<Query<MembershipQuery>, QueryRejection>,
) -> Result<ApiResponse<Paginated<MembershipDetail>>, AppError> {
    let Path(residence_id) = residence_id?;
    let Query(query) = query?;
    let page = PageRequest::from_query(query.page, query.limit)?;
    let pending = state
        .memberships()
        .list_pending(&subject, residence_id, page, query.search)
        .await?;
    Ok(ApiResponse::ok(pending))
}

#[instrument(skip(state, subject))]
pub async fn list_members(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    residence_id: Result<Path<ResidenceId>, PathRejection>,
    query: Result<Query<MembershipQuery>, QueryRejection>,
) -> Result<ApiResponse<Paginated<MembershipDetail>>, AppError> {
    let Path(residence_id) = residence_id?;
    let Query(query) = query?;
    let page = PageRequest::from_query(query.page, query.limit)?;
    let members = state
        .memberships()
        .list_members(&subject, residence_id, query.status, page, query.search)
        .await?;
    Ok(ApiResponse::ok(members))
}

#[instrument(skip(state, subject, input))]
pub async fn decide(
    State(state): State<AppState>,
    RequireSubject(subject): RequireSubject,
    id: Result<Path<MembershipId>, PathRejection>,
    input: Result<Json<Decide>, JsonRejection>,
) -> Result<ApiResponse<Membership>, AppError> {
    let Path(id) = id?;
    let Json(input) = input?;
    let membership = state
        .memberships()
        .decide(&subject, id, input.join_status, input.expected_version)
        .await?;
    Ok(ApiResponse::ok(membership).with_message("Membership updated"))
}

/// The caller's approved residences. Read from the subject, which was loaded
/// for this request.
pub async fn mine(
    RequireSubject(subject): RequireSubject,
) -> ApiResponse<BTreeSet<ResidenceId>> {
    ApiResponse::ok(subject.approved_residences)
}
