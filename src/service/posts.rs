use async_trait::async_trait;
use chrono::Utc;
use sea_orm::Set;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    entities::{accounts, posts},
    repo::{accounts::AccountsRepo, posts::PostsRepo},
    service::ServiceError,
};

/// A post joined with the uids its responses are built from.
#[derive(Debug)]
pub struct PostView {
    pub post: posts::Model,
    pub author_uid: Uuid,
    pub mention_uids: Vec<Uuid>,
}

#[async_trait]
pub trait PostsService: Send + Sync {
    async fn create(
        &self,
        author: &accounts::Model,
        content: String,
        mention_uids: Vec<Uuid>,
    ) -> Result<PostView, ServiceError>;
    async fn list(&self) -> Result<Vec<PostView>, ServiceError>;
    async fn get(&self, uid: Uuid) -> Result<PostView, ServiceError>;
    async fn update(
        &self,
        uid: Uuid,
        content: Option<String>,
        mention_uids: Option<Vec<Uuid>>,
    ) -> Result<PostView, ServiceError>;
    async fn delete(&self, uid: Uuid) -> Result<(), ServiceError>;
}

pub struct PostsServiceImpl {
    posts_repo: Arc<dyn PostsRepo>,
    accounts_repo: Arc<dyn AccountsRepo>,
}

impl PostsServiceImpl {
    pub fn new(posts_repo: Arc<dyn PostsRepo>, accounts_repo: Arc<dyn AccountsRepo>) -> Self {
        Self {
            posts_repo,
            accounts_repo,
        }
    }

    async fn resolve_mentions(&self, mention_uids: &[Uuid]) -> Result<Vec<i64>, ServiceError> {
        let mut unique = mention_uids.to_vec();
        unique.sort();
        unique.dedup();
        let found = self.accounts_repo.find_by_uids(&unique).await?;
        if found.len() != unique.len() {
            return Err(ServiceError::validation(
                "mentions",
                "mentions reference unknown accounts",
            ));
        }
        Ok(found.into_iter().map(|account| account.id).collect())
    }

    async fn view(&self, post: posts::Model) -> Result<PostView, ServiceError> {
        let author = self
            .accounts_repo
            .find_by_ids(&[post.author_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal("post author missing".to_string()))?;
        let mention_ids = self.posts_repo.mention_ids(post.id).await?;
        let mention_uids = self
            .accounts_repo
            .find_by_ids(&mention_ids)
            .await?
            .into_iter()
            .map(|account| account.uid)
            .collect();
        Ok(PostView {
            post,
            author_uid: author.uid,
            mention_uids,
        })
    }
}

fn require_content(content: &str) -> Result<(), ServiceError> {
    if content.trim().is_empty() {
        return Err(ServiceError::validation("content", "content required"));
    }
    Ok(())
}

#[async_trait]
impl PostsService for PostsServiceImpl {
    async fn create(
        &self,
        author: &accounts::Model,
        content: String,
        mention_uids: Vec<Uuid>,
    ) -> Result<PostView, ServiceError> {
        require_content(&content)?;
        let mention_ids = self.resolve_mentions(&mention_uids).await?;

        let model = posts::ActiveModel {
            uid: Set(Uuid::new_v4()),
            author_id: Set(author.id),
            content: Set(content),
            ..Default::default()
        };
        let post = self.posts_repo.insert_with_mentions(model, mention_ids).await?;
        self.view(post).await
    }

    async fn list(&self) -> Result<Vec<PostView>, ServiceError> {
        let posts = self.posts_repo.list().await?;
        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            views.push(self.view(post).await?);
        }
        Ok(views)
    }

    async fn get(&self, uid: Uuid) -> Result<PostView, ServiceError> {
        let post = self
            .posts_repo
            .find_by_uid(uid)
            .await?
            .ok_or(ServiceError::NotFound)?;
        self.view(post).await
    }

    async fn update(
        &self,
        uid: Uuid,
        content: Option<String>,
        mention_uids: Option<Vec<Uuid>>,
    ) -> Result<PostView, ServiceError> {
        let post = self
            .posts_repo
            .find_by_uid(uid)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let mention_ids = match &mention_uids {
            Some(uids) => Some(self.resolve_mentions(uids).await?),
            None => None,
        };

        let mut active: posts::ActiveModel = post.into();
        if let Some(content) = content {
            require_content(&content)?;
            active.content = Set(content);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = self.posts_repo.update_with_mentions(active, mention_ids).await?;
        self.view(updated).await
    }

    async fn delete(&self, uid: Uuid) -> Result<(), ServiceError> {
        let post = self
            .posts_repo
            .find_by_uid(uid)
            .await?
            .ok_or(ServiceError::NotFound)?;
        Ok(self.posts_repo.delete(post.id).await?)
    }
}
