//! Residence news.

use serde::Deserialize;
use tracing::{info, instrument};

use residence_hub_core::access::{
    AccessDenied, Operation, ResourceKind, SubjectAttrs, build_scope_predicate,
};
use residence_hub_core::models::News;
use residence_hub_core::{NewsId, PageRequest, Paginated, ResidenceId, Role};

use crate::db::store::{NewNews, NewsChanges};
use crate::db::{DynStore, NewsStore, ResidenceStore};
use crate::error::AppError;
use crate::services::{AccessGuard, non_blank};

/// Roles allowed to publish news into a residence.
const PUBLISHERS: &[Role] = &[Role::Manager, Role::Admin, Role::SuperAdmin];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNews {
    pub residence_id: ResidenceId,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNews {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

pub struct NewsService {
    store: DynStore,
    guard: AccessGuard,
}

impl NewsService {
    #[must_use]
    pub fn new(store: DynStore) -> Self {
        Self {
            guard: AccessGuard::new(store.clone()),
            store,
        }
    }

    async fn fetch(&self, id: NewsId) -> Result<News, AppError> {
        self.store
            .get_news(id)
            .await?
            .ok_or_else(|| AppError::not_found("news"))
    }

    async fn ensure_residence(&self, id: ResidenceId) -> Result<(), AppError> {
        match self.store.get_residence(id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("residence")),
        }
    }

    /// # Errors
    ///
    /// - `NotFound` if the residence does not exist
    /// - `Forbidden` unless the subject is a manager or in the admin tier
    /// - `BadRequest` for a blank title or content
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id, residence_id = %input.residence_id))]
    pub async fn create(&self, subject: &SubjectAttrs, input: CreateNews) -> Result<News, AppError> {
        self.ensure_residence(input.residence_id).await?;
        self.guard.require_role(
            subject,
            PUBLISHERS,
            Operation::WRITE_CONTENT,
            ResourceKind::News,
        )?;

        let news = self
            .store
            .create_news(NewNews {
                author_id: subject.user_id,
                residence_id: input.residence_id,
                title: non_blank("title", input.title)?,
                content: non_blank("content", input.content)?,
                image_url: input.image_url,
            })
            .await?;
        info!(news_id = %news.id, "News published");
        Ok(news)
    }

    /// News visible to the subject, newest first, optionally for one
    /// residence.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `residence_id` names no residence
    /// - `Forbidden` if a plain member names a residence they are not
    ///   approved in
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn list(
        &self,
        subject: &SubjectAttrs,
        residence_id: Option<ResidenceId>,
        page: PageRequest,
    ) -> Result<Paginated<News>, AppError> {
        if let Some(residence_id) = residence_id {
            self.ensure_residence(residence_id).await?;
        }

        let scope = build_scope_predicate(subject, residence_id);
        if residence_id.is_some() && scope.is_nothing() {
            return Err(AccessDenied {
                operation: Operation::Read,
                kind: ResourceKind::News,
            }
            .into());
        }
        Ok(self.store.list_news(&scope, page).await?)
    }

    /// # Errors
    ///
    /// - `NotFound` if the news does not exist
    /// - `Forbidden` unless author, member of its residence, or elevated
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn get(&self, subject: &SubjectAttrs, id: NewsId) -> Result<News, AppError> {
        let news = self.fetch(id).await?;
        self.guard.check(subject, &news.attrs(), Operation::Read)?;
        Ok(news)
    }

    /// # Errors
    ///
    /// - `NotFound` if the news does not exist
    /// - `Forbidden` unless author or admin tier
    #[instrument(skip(self, subject, input), fields(user_id = %subject.user_id))]
    pub async fn update(
        &self,
        subject: &SubjectAttrs,
        id: NewsId,
        input: UpdateNews,
    ) -> Result<News, AppError> {
        let news = self.fetch(id).await?;
        self.guard
            .check(subject, &news.attrs(), Operation::WRITE_CONTENT)?;

        let changes = NewsChanges {
            title: input.title.map(|t| non_blank("title", t)).transpose()?,
            content: input.content.map(|c| non_blank("content", c)).transpose()?,
            image_url: input.image_url,
        };
        let updated = self.store.update_news(id, changes).await?;
        info!(news_id = %id, "News updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// - `NotFound` if the news does not exist
    /// - `Forbidden` below the admin tier
    #[instrument(skip(self, subject), fields(user_id = %subject.user_id))]
    pub async fn delete(&self, subject: &SubjectAttrs, id: NewsId) -> Result<(), AppError> {
        let news = self.fetch(id).await?;
        self.guard.check(subject, &news.attrs(), Operation::Delete)?;
        self.store.delete_news(id).await?;
        info!(news_id = %id, "News deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use residence_hub_core::{Email, UserId};

    use super::*;
    use crate::db::InMemoryStore;
    use crate::db::store::{NewResidence, NewUser};
    use crate::db::UserStore;

    struct Fixture {
        service: NewsService,
        manager: SubjectAttrs,
        r1: ResidenceId,
        r2: ResidenceId,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let manager = store
            .create_user(NewUser {
                name: "Mara".to_owned(),
                email: Email::parse("mara@example.com").unwrap(),
                role: Role::Manager,
                is_verified: true,
            })
            .await
            .unwrap();
        let mut residences = Vec::new();
        for code in ["RES-100", "RES-200"] {
            let residence = store
                .create_residence(NewResidence {
                    name: code.to_owned(),
                    code: code.to_owned(),
                    street: None,
                    city: None,
                    state: None,
                    country: None,
                    kind: None,
                    creator_id: manager.id,
                })
                .await
                .unwrap();
            residences.push(residence.id);
        }

        let service = NewsService::new(store);
        let manager = SubjectAttrs::new(manager.id, Role::Manager);
        for residence_id in &residences {
            service
                .create(
                    &manager,
                    CreateNews {
                        residence_id: *residence_id,
                        title: "Lift maintenance".to_owned(),
                        content: "Monday morning".to_owned(),
                        image_url: None,
                    },
                )
                .await
                .unwrap();
        }

        Fixture {
            service,
            manager,
            r1: residences[0],
            r2: residences[1],
        }
    }

    #[tokio::test]
    async fn test_member_sees_only_approved_residences() {
        let f = fixture().await;
        let member =
            SubjectAttrs::new(UserId::generate(), Role::User).with_approved_residences([f.r1]);

        let all = f
            .service
            .list(&member, None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(all.meta.total_count, 1);
        assert_eq!(all.data[0].residence_id, f.r1);

        let own = f
            .service
            .list(&member, Some(f.r1), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(own.meta.total_count, 1);

        let err = f
            .service
            .list(&member, Some(f.r2), PageRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_no_memberships_lists_nothing() {
        let f = fixture().await;
        let outsider = SubjectAttrs::new(UserId::generate(), Role::User);
        let page = f
            .service
            .list(&outsider, None, PageRequest::default())
            .await
            .unwrap();
        assert!(page.data.is_empty());
    }

    #[tokio::test]
    async fn test_elevated_sees_everything() {
        let f = fixture().await;
        let page = f
            .service
            .list(&f.manager, None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total_count, 2);
    }

    #[tokio::test]
    async fn test_plain_user_cannot_publish() {
        let f = fixture().await;
        let member =
            SubjectAttrs::new(UserId::generate(), Role::User).with_approved_residences([f.r1]);
        let err = f
            .service
            .create(
                &member,
                CreateNews {
                    residence_id: f.r1,
                    title: "Party".to_owned(),
                    content: "Rooftop".to_owned(),
                    image_url: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_author_updates_but_cannot_delete() {
        let f = fixture().await;
        let page = f
            .service
            .list(&f.manager, Some(f.r1), PageRequest::default())
            .await
            .unwrap();
        let news_id = page.data[0].id;

        let updated = f
            .service
            .update(
                &f.manager,
                news_id,
                UpdateNews {
                    title: Some("Lift maintenance moved".to_owned()),
                    ..UpdateNews::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Lift maintenance moved");

        let err = f.service.delete(&f.manager, news_id).await.unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");
    }
}
