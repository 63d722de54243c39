use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entities::{post_mentions, posts},
    state::DatabaseClient,
};

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Insert the post and its mention rows in one transaction.
    async fn insert_with_mentions(
        &self,
        model: posts::ActiveModel,
        mention_ids: Vec<i64>,
    ) -> Result<posts::Model, sea_orm::DbErr>;
    /// Update the post and, when `mention_ids` is `Some`, replace its mention
    /// rows, in one transaction.
    async fn update_with_mentions(
        &self,
        model: posts::ActiveModel,
        mention_ids: Option<Vec<i64>>,
    ) -> Result<posts::Model, sea_orm::DbErr>;
    async fn find_by_uid(&self, uid: Uuid) -> Result<Option<posts::Model>, sea_orm::DbErr>;
    async fn find_by_id(&self, id: i64) -> Result<Option<posts::Model>, sea_orm::DbErr>;
    async fn list(&self) -> Result<Vec<posts::Model>, sea_orm::DbErr>;
    async fn delete(&self, id: i64) -> Result<(), sea_orm::DbErr>;
    async fn mention_ids(&self, post_id: i64) -> Result<Vec<i64>, sea_orm::DbErr>;
}

pub struct SeaOrmPostsRepo {
    db: std::sync::Arc<dyn DatabaseClient>,
}

impl SeaOrmPostsRepo {
    pub fn new(db: std::sync::Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }
}

async fn replace_mentions(
    txn: &DatabaseTransaction,
    post_id: i64,
    mention_ids: Vec<i64>,
) -> Result<(), sea_orm::DbErr> {
    post_mentions::Entity::delete_many()
        .filter(post_mentions::Column::PostId.eq(post_id))
        .exec(txn)
        .await?;

    if mention_ids.is_empty() {
        return Ok(());
    }

    let rows = mention_ids.into_iter().map(|account_id| post_mentions::ActiveModel {
        post_id: Set(post_id),
        account_id: Set(account_id),
        ..Default::default()
    });
    post_mentions::Entity::insert_many(rows).exec(txn).await?;
    Ok(())
}

fn unwrap_txn_err(err: TransactionError<sea_orm::DbErr>) -> sea_orm::DbErr {
    match err {
        TransactionError::Connection(err) => err,
        TransactionError::Transaction(err) => err,
    }
}

#[async_trait]
impl PostsRepo for SeaOrmPostsRepo {
    async fn insert_with_mentions(
        &self,
        model: posts::ActiveModel,
        mention_ids: Vec<i64>,
    ) -> Result<posts::Model, sea_orm::DbErr> {
        self.db
            .conn()
            .transaction::<_, posts::Model, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    let post = model.insert(txn).await?;
                    replace_mentions(txn, post.id, mention_ids).await?;
                    Ok(post)
                })
            })
            .await
            .map_err(unwrap_txn_err)
    }

    async fn update_with_mentions(
        &self,
        model: posts::ActiveModel,
        mention_ids: Option<Vec<i64>>,
    ) -> Result<posts::Model, sea_orm::DbErr> {
        self.db
            .conn()
            .transaction::<_, posts::Model, sea_orm::DbErr>(move |txn| {
                Box::pin(async move {
                    let post = model.update(txn).await?;
                    if let Some(mention_ids) = mention_ids {
                        replace_mentions(txn, post.id, mention_ids).await?;
                    }
                    Ok(post)
                })
            })
            .await
            .map_err(unwrap_txn_err)
    }

    async fn find_by_uid(&self, uid: Uuid) -> Result<Option<posts::Model>, sea_orm::DbErr> {
        posts::Entity::find()
            .filter(posts::Column::Uid.eq(uid))
            .one(self.db.conn())
            .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<posts::Model>, sea_orm::DbErr> {
        posts::Entity::find_by_id(id).one(self.db.conn()).await
    }

    async fn list(&self) -> Result<Vec<posts::Model>, sea_orm::DbErr> {
        posts::Entity::find()
            .order_by_desc(posts::Column::CreatedAt)
            .all(self.db.conn())
            .await
    }

    async fn delete(&self, id: i64) -> Result<(), sea_orm::DbErr> {
        posts::Entity::delete_by_id(id).exec(self.db.conn()).await?;
        Ok(())
    }

    async fn mention_ids(&self, post_id: i64) -> Result<Vec<i64>, sea_orm::DbErr> {
        let rows = post_mentions::Entity::find()
            .filter(post_mentions::Column::PostId.eq(post_id))
            .all(self.db.conn())
            .await?;
        Ok(rows.into_iter().map(|row| row.account_id).collect())
    }
}
