use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entities::{comment_mentions, comments},
    state::DatabaseClient,
};

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn insert_with_mentions(
        &self,
        model: comments::ActiveModel,
        mention_ids: Vec<i64>,
    ) -> Result<comments::Model, sea_orm::DbErr>;
    async fn update_with_mentions(
        &self,
        model: comments::ActiveModel,
        mention_ids: Option<Vec<i64>>,
    ) -> Result<comments::Model, sea_orm::DbErr>;
    async fn find_by_uid(&self, uid: Uuid) -> Result<Option<comments::Model>, sea_orm::DbErr>;
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<comments::Model>, sea_orm::DbErr>;
    async fn delete(&self, id: i64) -> Result<(), sea_orm::DbErr>;
    async fn mention_ids(&self, comment_id: i64) -> Result<Vec<i64>, sea_orm::DbErr>;
}

pub struct SeaOrmCommentsRepo {
    db: std::sync::Arc<dyn DatabaseClient>,
}

impl SeaOrmCommentsRepo {
    pub fn new(db: std::sync::Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }
}

async fn replace_mentions(
    txn: &DatabaseTransaction,
    comment_id: i64,
    mention_ids: Vec<i64>,
) -> Result<(), sea_orm::DbErr> {
    comment_mentions::Entity::delete_many()
        .filter(comment_mentions::Column::CommentId.eq(comment_id))
        .exec(txn)
        .await?;

    if mention_ids.is_empty() {
        return Ok(());
    }

    let rows = mention_ids
        .into_iter()
        .map(|account_id| comment_mentions::ActiveModel {
            comment_id: Set(comment_id),
            account_id: Set(account_id),
            ..Default::default()
        });
    comment_mentions::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

fn unwrap_txn_err(err: TransactionError<sea_orm::DbErr>) -> sea_orm::DbErr {
    match err {
        TransactionError::Connection(err) => err,
        TransactionError::Transaction(err) => err,
    }
}

#[async_trait]
impl CommentsRepo for SeaOrmCommentsRepo {
    async fn insert_with_mentions(
        &self,
        model: comments::ActiveModel,
        mention_ids: Vec<i64>,
    ) -> Result<comments::Model, sea_orm::DbErr> {
        self.db
            .conn()
            .transaction::<_, comments::Model, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    let comment = model.insert(txn).await?;
                    replace_mentions(txn, comment.id, mention_ids).await?;
                    Ok(comment)
                })
            })
            .await
            .map_err(unwrap_txn_err)
    }

    async fn update_with_mentions(
        &self,
        model: comments::ActiveModel,
        mention_ids: Option<Vec<i64>>,
    ) -> Result<comments::Model, sea_orm::DbErr> {
        self.db
            .conn()
            .transaction::<_, comments::Model, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    let comment = model.update(txn).await?;
                    if let Some(mention_ids) = mention_ids {
                        replace_mentions(txn, comment.id, mention_ids).await?;
                    }
                    Ok(comment)
                })
            })
            .await
            .map_err(unwrap_txn_err)
    }

    async fn find_by_uid(&self, uid: Uuid) -> Result<Option<comments::Model>, sea_orm::DbErr> {
        comments::Entity::find()
            .filter(comments::Column::Uid.eq(uid))
            .one(self.db.conn())
            .await
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<comments::Model>, sea_orm::DbErr> {
        comments::Entity::find()
            .filter(comments::Column::PostId.eq(post_id))
            .order_by_desc(comments::Column::CreatedAt)
            .all(self.db.conn())
            .await
    }

    async fn delete(&self, id: i64) -> Result<(), sea_orm::DbErr> {
        comments::Entity::delete_by_id(id)
            .exec(self.db.conn())
            .await?;
        Ok(())
    }

    async fn mention_ids(&self, comment_id: i64) -> Result<Vec<i64>, sea_orm::DbErr> {
        let rows = comment_mentions::Entity::find()
            .filter(comment_mentions::Column::CommentId.eq(comment_id))
            .all(self.db.conn())
            .await?;
        Ok(rows.into_iter().map(|row| row.account_id).collect())
    }
}
