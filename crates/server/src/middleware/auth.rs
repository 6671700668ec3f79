//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs issued elsewhere. `sub` carries the user id and
//! `exp` the expiry. The role is never taken from the token: it is reloaded
//! from the store together with the approved residences on every request.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use residence_hub_core::UserId;
use residence_hub_core::access::SubjectAttrs;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// JWT claims understood by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub exp: i64,
}

impl Claims {
    /// Claims for `user` expiring after `ttl`.
    #[must_use]
    pub fn new(user: UserId, ttl: Duration) -> Self {
        Self {
            sub: user,
            exp: (Utc::now() + ttl).timestamp(),
        }
    }
}

/// Extractor that requires a valid bearer token for an existing user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireSubject(subject): RequireSubject) -> impl IntoResponse {
///     format!("Hello, {}!", subject.user_id)
/// }
/// ```
pub struct RequireSubject(pub SubjectAttrs);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for RequireSubject {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_owned()))?;

        let claims = state.decode_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AppError::Unauthorized("invalid or expired token".to_owned())
        })?;

        let subject = state
            .guard()
            .load_subject(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown user".to_owned()))?;

        set_sentry_user(subject.user_id);
        tracing::Span::current().record("user_id", tracing::field::display(subject.user_id));
        Ok(Self(subject))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/news");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn test_claims_expire_in_future() {
        let claims = Claims::new(UserId::generate(), Duration::minutes(5));
        assert!(claims.exp > Utc::now().timestamp());
    }
}
