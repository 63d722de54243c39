use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{entities::accounts, state::DatabaseClient};

/// The three overlapping login namespaces, in login tie-break order. A login
/// identifier is matched against them one at a time; the first field with a
/// hit wins, so an email match always beats a username or phone match.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdentityField {
    Email,
    Username,
    Phone,
}

impl IdentityField {
    pub const LOGIN_ORDER: [IdentityField; 3] = [
        IdentityField::Email,
        IdentityField::Username,
        IdentityField::Phone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IdentityField::Email => "email",
            IdentityField::Username => "username",
            IdentityField::Phone => "phone",
        }
    }

    fn column(self) -> accounts::Column {
        match self {
            IdentityField::Email => accounts::Column::Email,
            IdentityField::Username => accounts::Column::Username,
            IdentityField::Phone => accounts::Column::Phone,
        }
    }
}

#[async_trait]
pub trait AccountsRepo: Send + Sync {
    async fn insert(
        &self,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr>;
    async fn update(
        &self,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr>;
    async fn find_by_uid(&self, uid: Uuid) -> Result<Option<accounts::Model>, sea_orm::DbErr>;
    async fn find_by_uids(
        &self,
        uids: &[Uuid],
    ) -> Result<Vec<accounts::Model>, sea_orm::DbErr>;
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<accounts::Model>, sea_orm::DbErr>;
    /// Case-insensitive lookup of one account by a single identity field.
    async fn find_by_field(
        &self,
        field: IdentityField,
        value: &str,
    ) -> Result<Option<accounts::Model>, sea_orm::DbErr>;
    /// Case-insensitive uniqueness probe for `value` in `field`, skipping
    /// `exclude_id` so an account can re-save its own current value.
    async fn find_conflict(
        &self,
        field: IdentityField,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<accounts::Model>, sea_orm::DbErr>;
}

pub struct SeaOrmAccountsRepo {
    db: std::sync::Arc<dyn DatabaseClient>,
}

impl SeaOrmAccountsRepo {
    pub fn new(db: std::sync::Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }

    fn field_matches(field: IdentityField, value: &str) -> sea_orm::sea_query::SimpleExpr {
        Expr::expr(Func::lower(Expr::col(field.column()))).eq(value.to_lowercase())
    }
}

#[async_trait]
impl AccountsRepo for SeaOrmAccountsRepo {
    async fn insert(
        &self,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr> {
        model.insert(self.db.conn()).await
    }

    async fn update(
        &self,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr> {
        model.update(self.db.conn()).await
    }

    async fn find_by_uid(&self, uid: Uuid) -> Result<Option<accounts::Model>, sea_orm::DbErr> {
        accounts::Entity::find()
            .filter(accounts::Column::Uid.eq(uid))
            .one(self.db.conn())
            .await
    }

    async fn find_by_uids(
        &self,
        uids: &[Uuid],
    ) -> Result<Vec<accounts::Model>, sea_orm::DbErr> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        accounts::Entity::find()
            .filter(accounts::Column::Uid.is_in(uids.iter().copied()))
            .all(self.db.conn())
            .await
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<accounts::Model>, sea_orm::DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.conn())
            .await
    }

    async fn find_by_field(
        &self,
        field: IdentityField,
        value: &str,
    ) -> Result<Option<accounts::Model>, sea_orm::DbErr> {
        accounts::Entity::find()
            .filter(Self::field_matches(field, value))
            .one(self.db.conn())
            .await
    }

    async fn find_conflict(
        &self,
        field: IdentityField,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<accounts::Model>, sea_orm::DbErr> {
        let mut query = accounts::Entity::find().filter(Self::field_matches(field, value));
        if let Some(id) = exclude_id {
            query = query.filter(accounts::Column::Id.ne(id));
        }
        query.one(self.db.conn()).await
    }
}
