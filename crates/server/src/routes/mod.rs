//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                             - Liveness
//! GET    /health/ready                       - Readiness (store ping)
//!
//! # Residences
//! POST   /api/v1/residences                  - Create residence
//! GET    /api/v1/residences                  - List residences
//! GET    /api/v1/residences/{id}             - Get residence
//! PATCH  /api/v1/residences/{id}             - Update residence
//! DELETE /api/v1/residences/{id}             - Delete residence
//!
//! # Memberships
//! POST   /api/v1/residences/{id}/join        - Request to join
//! GET    /api/v1/residences/{id}/pending     - Pending requests
//! GET    /api/v1/residences/{id}/members     - Members by status
//! PATCH  /api/v1/memberships/{id}            - Approve or reject
//! GET    /api/v1/memberships/mine            - Caller's approved residences
//!
//! # News
//! POST   /api/v1/news                        - Publish news
//! GET    /api/v1/news                        - Visible news
//! GET    /api/v1/residences/{id}/news        - News of one residence
//! GET|PATCH|DELETE /api/v1/news/{id}
//!
//! # Issue types
//! POST   /api/v1/issue-types                 - Add type (admin tier)
//! GET    /api/v1/issue-types                 - Catalogue
//! GET|PATCH|DELETE /api/v1/issue-types/{id}
//!
//! # Issue reports
//! POST   /api/v1/issue-reports               - File report
//! GET    /api/v1/issue-reports               - Visible reports
//! GET    /api/v1/issue-reports/{id}          - Report with timeline
//! PATCH  /api/v1/issue-reports/{id}          - Edit content
//! PATCH  /api/v1/issue-reports/{id}/status   - Status and assignee
//! DELETE /api/v1/issue-reports/{id}
//!
//! # Appointments
//! POST   /api/v1/appointments                - Book appointment
//! GET    /api/v1/appointments                - Own appointments
//! GET|PATCH|DELETE /api/v1/appointments/{id}
//! ```

pub mod appointments;
pub mod health;
pub mod issue_reports;
pub mod issue_types;
pub mod memberships;
pub mod news;
pub mod residences;

use std::time::Duration;

use axum::{
    Router,
    http::{Request, Response},
    routing::{get, patch, post},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// API routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        // Residences
        .route(
            "/residences",
            post(residences::create).get(residences::list),
        )
        .route(
            "/residences/{id}",
            get(residences::get)
                .patch(residences::update)
                .delete(residences::delete),
        )
        // Memberships
        .route("/residences/{id}/join", post(memberships::request_join))
        .route("/residences/{id}/pending", get(memberships::list_pending))
        .route("/residences/{id}/members", get(memberships::list_members))
        .route("/memberships/mine", get(memberships::mine))
        .route("/memberships/{id}", patch(memberships::decide))
        // News
        .route("/news", post(news::create).get(news::list))
        .route("/residences/{id}/news", get(news::list_for_residence))
        .route(
            "/news/{id}",
            get(news::get).patch(news::update).delete(news::delete),
        )
        // Issue types
        .route(
            "/issue-types",
            post(issue_types::create).get(issue_types::list),
        )
        .route(
            "/issue-types/{id}",
            get(issue_types::get)
                .patch(issue_types::update)
                .delete(issue_types::delete),
        )
        // Issue reports
        .route(
            "/issue-reports",
            post(issue_reports::create).get(issue_reports::list),
        )
        .route(
            "/issue-reports/{id}",
            get(issue_reports::get)
                .patch(issue_reports::update)
                .delete(issue_reports::delete),
        )
        .route(
            "/issue-reports/{id}/status",
            patch(issue_reports::update_status),
        )
        // Appointments
        .route(
            "/appointments",
            post(appointments::create).get(appointments::list),
        )
        .route(
            "/appointments/{id}",
            get(appointments::get)
                .patch(appointments::update)
                .delete(appointments::delete),
        );

    Router::new().nest("/api/v1", api)
}

/// The full application: health checks, API routes, and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
}
