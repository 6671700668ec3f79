//! Application state shared across handlers.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};

use crate::db::DynStore;
use crate::middleware::auth::Claims;
use crate::services::{
    AccessGuard, AppointmentService, IssueReportService, IssueTypeService, MembershipWorkflow,
    NewsService, ResidenceService,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: DynStore,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AppState {
    /// Build state over `store`, validating HS256 bearer tokens signed with
    /// `jwt_secret`.
    #[must_use]
    pub fn new(store: DynStore, jwt_secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            inner: Arc::new(AppStateInner {
                store,
                decoding_key: DecodingKey::from_secret(jwt_secret.expose_secret().as_bytes()),
                validation,
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &DynStore {
        &self.inner.store
    }

    pub(crate) fn decode_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.inner.decoding_key, &self.inner.validation)
            .map(|data| data.claims)
    }

    #[must_use]
    pub fn guard(&self) -> AccessGuard {
        AccessGuard::new(self.store().clone())
    }

    #[must_use]
    pub fn memberships(&self) -> MembershipWorkflow {
        MembershipWorkflow::new(self.store().clone())
    }

    #[must_use]
    pub fn residences(&self) -> ResidenceService {
        ResidenceService::new(self.store().clone())
    }

    #[must_use]
    pub fn news(&self) -> NewsService {
        NewsService::new(self.store().clone())
    }

    #[must_use]
    pub fn issue_reports(&self) -> IssueReportService {
        IssueReportService::new(self.store().clone())
    }

    #[must_use]
    pub fn issue_types(&self) -> IssueTypeService {
        IssueTypeService::new(self.store().clone())
    }

    #[must_use]
    pub fn appointments(&self) -> AppointmentService {
        AppointmentService::new(self.store().clone())
    }
}
