use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::{
    repo::{
        accounts::{AccountsRepo, SeaOrmAccountsRepo},
        comments::{CommentsRepo, SeaOrmCommentsRepo},
        posts::{PostsRepo, SeaOrmPostsRepo},
        username_changes::SeaOrmUsernameChangesRepo,
    },
    service::{
        comments::{CommentsService, CommentsServiceImpl},
        config::{ConfigService, ConfigServiceImpl},
        credentials::{CredentialsService, CredentialsServiceImpl},
        identity::{IdentityService, IdentityServiceImpl},
        otp::{FixedCodeOtpService, OtpService},
        posts::{PostsService, PostsServiceImpl},
        tokens::{RedisTokenService, TokenService},
    },
};

pub trait DatabaseClient: Send + Sync {
    fn conn(&self) -> &DatabaseConnection;
}

pub struct SeaOrmDatabaseClient {
    conn: DatabaseConnection,
}

impl SeaOrmDatabaseClient {
    pub async fn new() -> Self {
        let conn = crate::db::connect()
            .await
            .expect("database connection failed");
        crate::schema::apply(&conn)
            .await
            .expect("schema apply failed");
        Self { conn }
    }
}

impl DatabaseClient for SeaOrmDatabaseClient {
    fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}

pub struct AppState {
    config: Arc<dyn ConfigService>,
    accounts_repo: Arc<dyn AccountsRepo>,
    identity: Arc<dyn IdentityService>,
    credentials: Arc<dyn CredentialsService>,
    tokens: Arc<dyn TokenService>,
    posts: Arc<dyn PostsService>,
    comments: Arc<dyn CommentsService>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config: Arc<dyn ConfigService> = Arc::new(ConfigServiceImpl::new());
        let db: Arc<dyn DatabaseClient> = Arc::new(SeaOrmDatabaseClient::new().await);

        let accounts_repo: Arc<dyn AccountsRepo> = Arc::new(SeaOrmAccountsRepo::new(db.clone()));
        let username_changes_repo = Arc::new(SeaOrmUsernameChangesRepo::new(db.clone()));
        let posts_repo: Arc<dyn PostsRepo> = Arc::new(SeaOrmPostsRepo::new(db.clone()));
        let comments_repo: Arc<dyn CommentsRepo> = Arc::new(SeaOrmCommentsRepo::new(db.clone()));
        let otp: Arc<dyn OtpService> = Arc::new(FixedCodeOtpService);

        let values = config.values();
        let redis_url = values
            .redis_url
            .clone()
            .expect("REDIS_URL is required");
        let tokens = Arc::new(
            RedisTokenService::new(
                &redis_url,
                values.access_token_ttl_seconds,
                values.refresh_token_ttl_seconds,
                values.token_key_prefix.clone(),
            )
            .await
            .expect("redis connection failed"),
        );

        let identity = Arc::new(IdentityServiceImpl::new(accounts_repo.clone()));
        let credentials = Arc::new(CredentialsServiceImpl::new(
            accounts_repo.clone(),
            username_changes_repo,
            otp,
        ));
        let posts = Arc::new(PostsServiceImpl::new(
            posts_repo.clone(),
            accounts_repo.clone(),
        ));
        let comments = Arc::new(CommentsServiceImpl::new(
            comments_repo,
            posts_repo,
            accounts_repo.clone(),
        ));

        Arc::new(Self {
            config,
            accounts_repo,
            identity,
            credentials,
            tokens,
            posts,
            comments,
        })
    }

    pub fn config(&self) -> &dyn ConfigService {
        self.config.as_ref()
    }

    pub fn accounts_repo(&self) -> &dyn AccountsRepo {
        self.accounts_repo.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentityService {
        self.identity.as_ref()
    }

    pub fn credentials(&self) -> &dyn CredentialsService {
        self.credentials.as_ref()
    }

    pub fn tokens(&self) -> &dyn TokenService {
        self.tokens.as_ref()
    }

    pub fn posts(&self) -> &dyn PostsService {
        self.posts.as_ref()
    }

    pub fn comments(&self) -> &dyn CommentsService {
        self.comments.as_ref()
    }
}
