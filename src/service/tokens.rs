use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenData {
    pub account_uid: Uuid,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum TokenError {
    Redis(redis::RedisError),
    Serde(serde_json::Error),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Redis(err) => write!(f, "redis error: {}", err),
            TokenError::Serde(err) => write!(f, "serde error: {}", err),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<redis::RedisError> for TokenError {
    fn from(err: redis::RedisError) -> Self {
        TokenError::Redis(err)
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(err: serde_json::Error) -> Self {
        TokenError::Serde(err)
    }
}

#[async_trait]
pub trait TokenService: Send + Sync {
    /// Issue a fresh access/refresh pair for the account.
    async fn issue(&self, account_uid: Uuid) -> Result<TokenPair, TokenError>;
    /// Resolve an access token to the account uid it was issued for.
    async fn authenticate(&self, access_token: &str) -> Result<Option<Uuid>, TokenError>;
    /// Exchange a refresh token for a new pair, invalidating the old one.
    async fn refresh(&self, refresh_token: &str) -> Result<Option<TokenPair>, TokenError>;
}

/// Opaque bearer tokens backed by Redis. Only a SHA-256 digest of each token
/// is used as the storage key, so a Redis dump does not yield usable tokens.
pub struct RedisTokenService {
    conn: Arc<Mutex<MultiplexedConnection>>,
    access_ttl_seconds: u64,
    refresh_ttl_seconds: u64,
    key_prefix: String,
}

impl RedisTokenService {
    pub async fn new(
        redis_url: &str,
        access_ttl_seconds: u64,
        refresh_ttl_seconds: u64,
        key_prefix: String,
    ) -> Result<Self, TokenError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            access_ttl_seconds,
            refresh_ttl_seconds,
            key_prefix,
        })
    }

    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn key(&self, kind: &str, token: &str) -> String {
        format!("{}:{}:{}", self.key_prefix, kind, Self::hash_token(token))
    }

    async fn store_pair(&self, account_uid: Uuid) -> Result<TokenPair, TokenError> {
        let pair = TokenPair {
            access_token: Self::generate_token(),
            refresh_token: Self::generate_token(),
        };
        let payload = serde_json::to_string(&TokenData {
            account_uid,
            issued_at: Utc::now(),
        })?;

        let mut conn = self.conn.lock().await;
        conn.set_ex::<_, _, ()>(
            self.key("access", &pair.access_token),
            payload.clone(),
            self.access_ttl_seconds,
        )
        .await?;
        conn.set_ex::<_, _, ()>(
            self.key("refresh", &pair.refresh_token),
            payload,
            self.refresh_ttl_seconds,
        )
        .await?;
        Ok(pair)
    }

    async fn load(&self, key: String) -> Result<Option<TokenData>, TokenError> {
        let mut conn = self.conn.lock().await;
        let value: Option<String> = conn.get(key).await?;
        let Some(value) = value else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&value)?))
    }
}

#[async_trait]
impl TokenService for RedisTokenService {
    async fn issue(&self, account_uid: Uuid) -> Result<TokenPair, TokenError> {
        self.store_pair(account_uid).await
    }

    async fn authenticate(&self, access_token: &str) -> Result<Option<Uuid>, TokenError> {
        let data = self.load(self.key("access", access_token)).await?;
        Ok(data.map(|data| data.account_uid))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Option<TokenPair>, TokenError> {
        let key = self.key("refresh", refresh_token);
        let Some(data) = self.load(key.clone()).await? else {
            return Ok(None);
        };

        {
            let mut conn = self.conn.lock().await;
            let _: () = conn.del(key).await?;
        }

        let pair = self.store_pair(data.account_uid).await?;
        Ok(Some(pair))
    }
}
