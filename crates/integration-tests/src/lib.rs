//! Integration tests for Residence Hub.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p residence-hub-integration-tests
//! ```
//!
//! The tests run against [`InMemoryStore`], either through the services
//! directly or through the full axum router with `tower::ServiceExt::oneshot`.
//! No database or network is needed.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Duration;
use jsonwebtoken::{EncodingKey, Header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use residence_hub_core::access::SubjectAttrs;
use residence_hub_core::models::{Residence, User};
use residence_hub_core::{Email, Role, UserId};
use residence_hub_server::db::store::{NewResidence, NewUser};
use residence_hub_server::db::{DynStore, InMemoryStore, ResidenceStore, UserStore};
use residence_hub_server::middleware::Claims;
use residence_hub_server::services::AccessGuard;
use residence_hub_server::{AppState, app};

/// Signing secret shared by the router under test and the token helper.
pub const JWT_SECRET: &str = "q8Vx!3rLm#T0zKp2@wYb7&Nd5^Hc9*Fs";

/// A fresh in-memory store with seeding helpers.
pub struct TestContext {
    pub store: DynStore,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
        }
    }

    pub async fn user(&self, name: &str, role: Role) -> User {
        self.store
            .create_user(NewUser {
                name: name.to_owned(),
                email: Email::parse(&format!("{name}@example.com")).unwrap(),
                role,
                is_verified: true,
            })
            .await
            .unwrap()
    }

    pub async fn residence(&self, code: &str, creator: UserId) -> Residence {
        self.store
            .create_residence(NewResidence {
                name: format!("Residence {code}"),
                code: code.to_owned(),
                street: None,
                city: Some("Lisbon".to_owned()),
                state: None,
                country: Some("PT".to_owned()),
                kind: None,
                creator_id: creator,
            })
            .await
            .unwrap()
    }

    /// The subject as the auth extractor would build it right now.
    pub async fn subject(&self, user: UserId) -> SubjectAttrs {
        AccessGuard::new(self.store.clone())
            .load_subject(user)
            .await
            .unwrap()
            .unwrap()
    }

    /// Router wired to this store.
    #[must_use]
    pub fn router(&self) -> Router {
        app(AppState::new(
            self.store.clone(),
            &SecretString::from(JWT_SECRET),
        ))
    }
}

/// A bearer token for `user` valid for an hour.
#[must_use]
pub fn token_for(user: UserId) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &Claims::new(user, Duration::hours(1)),
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Send one request through `router` and decode the JSON body.
pub async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
