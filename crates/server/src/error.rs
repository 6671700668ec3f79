//! Unified error handling for the API.
//!
//! Every failure leaves a handler as [`AppError`], which renders the JSON
//! envelope `{success: false, message, data: null}` with the matching status.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use residence_hub_core::access::AccessDenied;
use residence_hub_core::{PageError, UserId};

use crate::db::RepositoryError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or invalid bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The policy denied the operation.
    #[error("Forbidden: {0}")]
    Forbidden(#[from] AccessDenied),

    /// Uniqueness, transition, or version conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Stable machine-readable kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "INTERNAL",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::BadRequest(_) => "VALIDATION",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_owned()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Database(other),
        }
    }
}

impl From<PageError> for AppError {
    fn from(err: PageError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

// Extractor rejections render through the envelope as 400s.

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Response envelope shared by success and error bodies.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

/// Successful response wrapped in the envelope.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    message: &'static str,
    data: T,
}

impl<T> ApiResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: "OK",
            data,
        }
    }

    pub const fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: "Created",
            data,
        }
    }

    #[must_use]
    pub const fn with_message(mut self, message: &'static str) -> Self {
        self.message = message;
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            message: self.message.to_owned(),
            data: Some(self.data),
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) => "Internal server error".to_owned(),
            Self::Forbidden(denied) => denied.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(reason)
            | Self::Conflict(reason)
            | Self::BadRequest(reason) => reason.clone(),
        };

        let body = Envelope::<()> {
            success: false,
            message,
            data: None,
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Set the Sentry user context for the current request.
pub fn set_sentry_user(user_id: UserId) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use residence_hub_core::access::{Operation, ResourceKind};

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::not_found("residence");
        assert_eq!(err.to_string(), "Not found: residence");

        let err = AppError::BadRequest("invalid input".to_owned());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(get_status(AppError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption(
                "test".to_owned()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_map_to_kinds() {
        assert_eq!(AppError::from(RepositoryError::NotFound).kind(), "NOT_FOUND");
        assert_eq!(
            AppError::from(RepositoryError::Conflict("dup".to_owned())).kind(),
            "CONFLICT"
        );
        assert_eq!(
            AppError::from(RepositoryError::DataCorruption("bad".to_owned())).kind(),
            "INTERNAL"
        );
    }

    #[tokio::test]
    async fn test_forbidden_names_operation_and_kind() {
        let err = AppError::from(AccessDenied {
            operation: Operation::Delete,
            kind: ResourceKind::News,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "DELETE on news is not permitted");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption("row 7".to_owned()));
        let body = body_json(err.into_response()).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let response = ApiResponse::created(serde_json::json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 1);
    }
}
