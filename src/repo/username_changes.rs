use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set, TransactionError, TransactionTrait};

use crate::{
    entities::{accounts, username_changes},
    state::DatabaseClient,
};

#[async_trait]
pub trait UsernameChangesRepo: Send + Sync {
    /// Assign `new_username` to the account and append the audit row in one
    /// transaction. If either write fails, neither is committed.
    async fn apply_change(
        &self,
        account: accounts::Model,
        new_username: String,
    ) -> Result<(accounts::Model, username_changes::Model), sea_orm::DbErr>;
}

pub struct SeaOrmUsernameChangesRepo {
    db: std::sync::Arc<dyn DatabaseClient>,
}

impl SeaOrmUsernameChangesRepo {
    pub fn new(db: std::sync::Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsernameChangesRepo for SeaOrmUsernameChangesRepo {
    async fn apply_change(
        &self,
        account: accounts::Model,
        new_username: String,
    ) -> Result<(accounts::Model, username_changes::Model), sea_orm::DbErr> {
        let result = self
            .db
            .conn()
            .transaction::<_, (accounts::Model, username_changes::Model), sea_orm::DbErr>(
                move |txn| {
                    Box::pin(async move {
                        let old_username = account.username.clone();

                        let mut active: accounts::ActiveModel = account.into();
                        active.username = Set(Some(new_username.clone()));
                        active.updated_at = Set(Utc::now().into());
                        let updated = active.update(txn).await?;

                        let record = username_changes::ActiveModel {
                            account_id: Set(updated.id),
                            old_username: Set(old_username),
                            new_username: Set(new_username),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;

                        Ok((updated, record))
                    })
                },
            )
            .await;

        match result {
            Ok(pair) => Ok(pair),
            Err(TransactionError::Connection(err)) => Err(err),
            Err(TransactionError::Transaction(err)) => Err(err),
        }
    }
}
