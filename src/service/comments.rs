use async_trait::async_trait;
use chrono::Utc;
use sea_orm::Set;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    entities::{accounts, comments},
    repo::{accounts::AccountsRepo, comments::CommentsRepo, posts::PostsRepo},
    service::ServiceError,
};

#[derive(Debug)]
pub struct CommentView {
    pub comment: comments::Model,
    pub post_uid: Uuid,
    pub author_uid: Uuid,
    pub mention_uids: Vec<Uuid>,
}

#[async_trait]
pub trait CommentsService: Send + Sync {
    async fn create(
        &self,
        post_uid: Uuid,
        author: &accounts::Model,
        content: String,
        mention_uids: Vec<Uuid>,
    ) -> Result<CommentView, ServiceError>;
    async fn list_by_post(&self, post_uid: Uuid) -> Result<Vec<CommentView>, ServiceError>;
    async fn get(&self, uid: Uuid) -> Result<CommentView, ServiceError>;
    async fn update(
        &self,
        uid: Uuid,
        content: Option<String>,
        mention_uids: Option<Vec<Uuid>>,
    ) -> Result<CommentView, ServiceError>;
    async fn delete(&self, uid: Uuid) -> Result<(), ServiceError>;
}

pub struct CommentsServiceImpl {
    comments_repo: Arc<dyn CommentsRepo>,
    posts_repo: Arc<dyn PostsRepo>,
    accounts_repo: Arc<dyn AccountsRepo>,
}

impl CommentsServiceImpl {
    pub fn new(
        comments_repo: Arc<dyn CommentsRepo>,
        posts_repo: Arc<dyn PostsRepo>,
        accounts_repo: Arc<dyn AccountsRepo>,
    ) -> Self {
        Self {
            comments_repo,
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

    async fn view(&self, comment: comments::Model) -> Result<CommentView, ServiceError> {
        let post = self
            .posts_repo
            .find_by_id(comment.post_id)
            .await?
            .ok_or_else(|| ServiceError::Internal("comment post missing".to_string()))?;
        let author = self
            .accounts_repo
            .find_by_ids(&[comment.author_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal("comment author missing".to_string()))?;
        let mention_ids = self.comments_repo.mention_ids(comment.id).await?;
        let mention_uids = self
            .accounts_repo
            .find_by_ids(&mention_ids)
            .await?
            .into_iter()
            .map(|account| account.uid)
            .collect();
        Ok(CommentView {
            comment,
            post_uid: post.uid,
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
impl CommentsService for CommentsServiceImpl {
    async fn create(
        &self,
        post_uid: Uuid,
        author: &accounts::Model,
        content: String,
        mention_uids: Vec<Uuid>,
    ) -> Result<CommentView, ServiceError> {
        let post = self
            .posts_repo
            .find_by_uid(post_uid)
            .await?
            .ok_or(ServiceError::NotFound)?;
        require_content(&content)?;
        let mention_ids = self.resolve_mentions(&mention_uids).await?;

        let model = comments::ActiveModel {
            uid: Set(Uuid::new_v4()),
            post_id: Set(post.id),
            author_id: Set(author.id),
            content: Set(content),
            ..Default::default()
        };
        let comment = self
            .comments_repo
            .insert_with_mentions(model, mention_ids)
            .await?;
        self.view(comment).await
    }

    async fn list_by_post(&self, post_uid: Uuid) -> Result<Vec<CommentView>, ServiceError> {
        let post = self
            .posts_repo
            .find_by_uid(post_uid)
            .await?
            .ok_or(ServiceError::NotFound)?;
        let comments = self.comments_repo.list_by_post(post.id).await?;
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            views.push(self.view(comment).await?);
        }
        Ok(views)
    }

    async fn get(&self, uid: Uuid) -> Result<CommentView, ServiceError> {
        let comment = self
            .comments_repo
            .find_by_uid(uid)
            .await?
            .ok_or(ServiceError::NotFound)?;
        self.view(comment).await
    }

    async fn update(
        &self,
        uid: Uuid,
        content: Option<String>,
        mention_uids: Option<Vec<Uuid>>,
    ) -> Result<CommentView, ServiceError> {
        let comment = self
            .comments_repo
            .find_by_uid(uid)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let mention_ids = match &mention_uids {
            Some(uids) => Some(self.resolve_mentions(uids).await?),
            None => None,
        };

        let mut active: comments::ActiveModel = comment.into();
        if let Some(content) = content {
            require_content(&content)?;
            active.content = Set(content);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = self
            .comments_repo
            .update_with_mentions(active, mention_ids)
            .await?;
        self.view(updated).await
    }

    async fn delete(&self, uid: Uuid) -> Result<(), ServiceError> {
        let comment = self
            .comments_repo
            .find_by_uid(uid)
            .await?
            .ok_or(ServiceError::NotFound)?;
        Ok(self.comments_repo.delete(comment.id).await?)
    }
}
