//! In-memory implementations of the repo traits for service-level tests,
//! including emulation of the schema's case-insensitive unique indexes (the
//! conflict errors carry the index name, like Postgres constraint rejections).

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc, Mutex,
};
use uuid::Uuid;

use crate::{
    entities::{accounts, comments, posts, username_changes},
    repo::{
        accounts::{AccountsRepo, IdentityField},
        comments::CommentsRepo,
        posts::PostsRepo,
        username_changes::UsernameChangesRepo,
    },
    service::password,
};

pub fn account_model(
    id: i64,
    email: Option<&str>,
    username: Option<&str>,
    phone: Option<&str>,
    raw_password: &str,
) -> accounts::Model {
    let now = Utc::now().into();
    accounts::Model {
        id,
        uid: Uuid::new_v4(),
        username: username.map(str::to_string),
        email: email.map(str::to_string),
        phone: phone.map(str::to_string),
        password_hash: password::hash(raw_password).expect("hash"),
        first_name: None,
        last_name: None,
        created_at: now,
        updated_at: now,
    }
}

fn value<T>(av: ActiveValue<T>) -> Option<T>
where
    T: Into<sea_orm::Value>,
{
    match av {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v),
        ActiveValue::NotSet => None,
    }
}

fn duplicate_key(index: &str) -> sea_orm::DbErr {
    sea_orm::DbErr::Custom(format!(
        "duplicate key value violates unique constraint \"{}\"",
        index
    ))
}

pub struct MemoryAccountsRepo {
    rows: Mutex<Vec<accounts::Model>>,
    next_id: AtomicI64,
}

impl MemoryAccountsRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        })
    }

    pub fn seed(&self, model: accounts::Model) {
        self.next_id.fetch_max(model.id + 1, Ordering::SeqCst);
        self.rows.lock().unwrap().push(model);
    }

    pub fn get(&self, id: i64) -> accounts::Model {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .expect("account seeded")
    }

    pub fn replace(&self, model: accounts::Model) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(slot) = rows.iter_mut().find(|row| row.id == model.id) {
            *slot = model;
        }
    }

    fn field_value(row: &accounts::Model, field: IdentityField) -> Option<&str> {
        match field {
            IdentityField::Email => row.email.as_deref(),
            IdentityField::Username => row.username.as_deref(),
            IdentityField::Phone => row.phone.as_deref(),
        }
    }

    fn check_unique(
        rows: &[accounts::Model],
        candidate: &accounts::Model,
    ) -> Result<(), sea_orm::DbErr> {
        let probes: [(Option<&str>, &str, fn(&accounts::Model) -> Option<&str>); 3] = [
            (candidate.email.as_deref(), "accounts_email_unique", |a| {
                a.email.as_deref()
            }),
            (
                candidate.username.as_deref(),
                "accounts_username_unique",
                |a| a.username.as_deref(),
            ),
            (candidate.phone.as_deref(), "accounts_phone_unique", |a| {
                a.phone.as_deref()
            }),
        ];
        for (value, index, get) in probes {
            let Some(value) = value else { continue };
            let value = value.to_lowercase();
            let clash = rows.iter().any(|row| {
                row.id != candidate.id
                    && get(row).map(|v| v.to_lowercase()) == Some(value.clone())
            });
            if clash {
                return Err(duplicate_key(index));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountsRepo for MemoryAccountsRepo {
    async fn insert(
        &self,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr> {
        let now = Utc::now().into();
        let row = accounts::Model {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            uid: value(model.uid).unwrap_or_else(Uuid::new_v4),
            username: value(model.username).flatten(),
            email: value(model.email).flatten(),
            phone: value(model.phone).flatten(),
            password_hash: value(model.password_hash).unwrap_or_default(),
            first_name: value(model.first_name).flatten(),
            last_name: value(model.last_name).flatten(),
            created_at: now,
            updated_at: now,
        };
        let mut rows = self.rows.lock().unwrap();
        Self::check_unique(&rows, &row)?;
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        model: accounts::ActiveModel,
    ) -> Result<accounts::Model, sea_orm::DbErr> {
        let row = accounts::Model {
            id: value(model.id).expect("id present"),
            uid: value(model.uid).expect("uid present"),
            username: value(model.username).flatten(),
            email: value(model.email).flatten(),
            phone: value(model.phone).flatten(),
            password_hash: value(model.password_hash).expect("hash present"),
            first_name: value(model.first_name).flatten(),
            last_name: value(model.last_name).flatten(),
            created_at: value(model.created_at).expect("created_at present"),
            updated_at: value(model.updated_at).expect("updated_at present"),
        };
        let mut rows = self.rows.lock().unwrap();
        Self::check_unique(&rows, &row)?;
        let slot = rows
            .iter_mut()
            .find(|existing| existing.id == row.id)
            .ok_or_else(|| sea_orm::DbErr::RecordNotFound("account".to_string()))?;
        *slot = row.clone();
        Ok(row)
    }

    async fn find_by_uid(&self, uid: Uuid) -> Result<Option<accounts::Model>, sea_orm::DbErr> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.uid == uid)
            .cloned())
    }

    async fn find_by_uids(
        &self,
        uids: &[Uuid],
    ) -> Result<Vec<accounts::Model>, sea_orm::DbErr> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| uids.contains(&row.uid))
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<accounts::Model>, sea_orm::DbErr> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| ids.contains(&row.id))
            .cloned()
            .collect())
    }

    async fn find_by_field(
        &self,
        field: IdentityField,
        value: &str,
    ) -> Result<Option<accounts::Model>, sea_orm::DbErr> {
        let needle = value.to_lowercase();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| {
                Self::field_value(row, field).map(|v| v.to_lowercase()) == Some(needle.clone())
            })
            .cloned())
    }

    async fn find_conflict(
        &self,
        field: IdentityField,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<Option<accounts::Model>, sea_orm::DbErr> {
        let needle = value.to_lowercase();
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| {
                Some(row.id) != exclude_id
                    && Self::field_value(row, field).map(|v| v.to_lowercase())
                        == Some(needle.clone())
            })
            .cloned())
    }
}

pub struct MemoryUsernameChangesRepo {
    accounts: Arc<MemoryAccountsRepo>,
    records: Mutex<Vec<username_changes::Model>>,
}

impl MemoryUsernameChangesRepo {
    pub fn new(accounts: Arc<MemoryAccountsRepo>) -> Arc<Self> {
        Arc::new(Self {
            accounts,
            records: Mutex::new(Vec::new()),
        })
    }

    pub fn records(&self) -> Vec<username_changes::Model> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsernameChangesRepo for MemoryUsernameChangesRepo {
    async fn apply_change(
        &self,
        account: accounts::Model,
        new_username: String,
    ) -> Result<(accounts::Model, username_changes::Model), sea_orm::DbErr> {
        let old_username = account.username.clone();
        let mut updated = account;
        updated.username = Some(new_username.clone());
        updated.updated_at = Utc::now().into();
        self.accounts.replace(updated.clone());

        let mut records = self.records.lock().unwrap();
        let record = username_changes::Model {
            id: records.len() as i64 + 1,
            account_id: updated.id,
            old_username,
            new_username,
            created_at: Utc::now().into(),
        };
        records.push(record.clone());
        Ok((updated, record))
    }
}

pub struct MemoryPostsRepo {
    rows: Mutex<Vec<posts::Model>>,
    mentions: Mutex<HashMap<i64, Vec<i64>>>,
    next_id: AtomicI64,
}

impl MemoryPostsRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            mentions: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        })
    }

    fn model_from(active: posts::ActiveModel, id: i64) -> posts::Model {
        let now = Utc::now().into();
        posts::Model {
            id,
            uid: value(active.uid).unwrap_or_else(Uuid::new_v4),
            author_id: value(active.author_id).expect("author present"),
            content: value(active.content).expect("content present"),
            created_at: value(active.created_at).unwrap_or(now),
            updated_at: value(active.updated_at).unwrap_or(now),
        }
    }
}

#[async_trait]
impl PostsRepo for MemoryPostsRepo {
    async fn insert_with_mentions(
        &self,
        model: posts::ActiveModel,
        mention_ids: Vec<i64>,
    ) -> Result<posts::Model, sea_orm::DbErr> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = Self::model_from(model, id);
        self.rows.lock().unwrap().push(row.clone());
        self.mentions.lock().unwrap().insert(id, mention_ids);
        Ok(row)
    }

    async fn update_with_mentions(
        &self,
        model: posts::ActiveModel,
        mention_ids: Option<Vec<i64>>,
    ) -> Result<posts::Model, sea_orm::DbErr> {
        let id = value(model.id.clone()).expect("id present");
        let row = Self::model_from(model, id);
        let mut rows = self.rows.lock().unwrap();
        let slot = rows
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or_else(|| sea_orm::DbErr::RecordNotFound("post".to_string()))?;
        *slot = row.clone();
        if let Some(mention_ids) = mention_ids {
            self.mentions.lock().unwrap().insert(id, mention_ids);
        }
        Ok(row)
    }

    async fn find_by_uid(&self, uid: Uuid) -> Result<Option<posts::Model>, sea_orm::DbErr> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.uid == uid)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<posts::Model>, sea_orm::DbErr> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<posts::Model>, sea_orm::DbErr> {
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<(), sea_orm::DbErr> {
        self.rows.lock().unwrap().retain(|row| row.id != id);
        self.mentions.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn mention_ids(&self, post_id: i64) -> Result<Vec<i64>, sea_orm::DbErr> {
        Ok(self
            .mentions
            .lock()
            .unwrap()
            .get(&post_id)
            .cloned()
            .unwrap_or_default())
    }
}

pub struct MemoryCommentsRepo {
    rows: Mutex<Vec<comments::Model>>,
    mentions: Mutex<HashMap<i64, Vec<i64>>>,
    next_id: AtomicI64,
}

impl MemoryCommentsRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            mentions: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        })
    }

    fn model_from(active: comments::ActiveModel, id: i64) -> comments::Model {
        let now = Utc::now().into();
        comments::Model {
            id,
            uid: value(active.uid).unwrap_or_else(Uuid::new_v4),
            post_id: value(active.post_id).expect("post present"),
            author_id: value(active.author_id).expect("author present"),
            content: value(active.content).expect("content present"),
            created_at: value(active.created_at).unwrap_or(now),
            updated_at: value(active.updated_at).unwrap_or(now),
        }
    }
}

#[async_trait]
impl CommentsRepo for MemoryCommentsRepo {
    async fn insert_with_mentions(
        &self,
        model: comments::ActiveModel,
        mention_ids: Vec<i64>,
    ) -> Result<comments::Model, sea_orm::DbErr> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = Self::model_from(model, id);
        self.rows.lock().unwrap().push(row.clone());
        self.mentions.lock().unwrap().insert(id, mention_ids);
        Ok(row)
    }

    async fn update_with_mentions(
        &self,
        model: comments::ActiveModel,
        mention_ids: Option<Vec<i64>>,
    ) -> Result<comments::Model, sea_orm::DbErr> {
        let id = value(model.id.clone()).expect("id present");
        let row = Self::model_from(model, id);
        let mut rows = self.rows.lock().unwrap();
        let slot = rows
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or_else(|| sea_orm::DbErr::RecordNotFound("comment".to_string()))?;
        *slot = row.clone();
        if let Some(mention_ids) = mention_ids {
            self.mentions.lock().unwrap().insert(id, mention_ids);
        }
        Ok(row)
    }

    async fn find_by_uid(&self, uid: Uuid) -> Result<Option<comments::Model>, sea_orm::DbErr> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.uid == uid)
            .cloned())
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<comments::Model>, sea_orm::DbErr> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.post_id == post_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn delete(&self, id: i64) -> Result<(), sea_orm::DbErr> {
        self.rows.lock().unwrap().retain(|row| row.id != id);
        self.mentions.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn mention_ids(&self, comment_id: i64) -> Result<Vec<i64>, sea_orm::DbErr> {
        Ok(self
            .mentions
            .lock()
            .unwrap()
            .get(&comment_id)
            .cloned()
            .unwrap_or_default())
    }
}
