use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::{
    auth::{jwt::TokenService, repo::{PgUserRepository, UserRepository}},
    cache::{Cache, MemoryCache},
    clock::SystemClock,
    config::AppConfig,
    contacts::repo::{ContactRepository, PgContactRepository},
    mailer::{EmailSender, SmtpMailer},
    rate_limit::RateLimiter,
    storage::{AvatarStore, S3AvatarStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: TokenService,
    pub users: Arc<dyn UserRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub mailer: Arc<dyn EmailSender>,
    pub avatars: Arc<dyn AvatarStore>,
    pub cache: Arc<dyn Cache>,
    pub contact_create_limiter: RateLimiter,
}

impl AppState {
    pub async fn init(config: Arc<AppConfig>, db: PgPool) -> anyhow::Result<Self> {
        let avatars = Arc::new(S3AvatarStore::new(&config.storage).await?) as Arc<dyn AvatarStore>;
        let mailer =
            Arc::new(SmtpMailer::new(&config.smtp, &config.public_base_url)) as Arc<dyn EmailSender>;

        Ok(Self {
            tokens: TokenService::new(&config.jwt, Arc::new(SystemClock)),
            users: Arc::new(PgUserRepository::new(db.clone())),
            contacts: Arc::new(PgContactRepository::new(db)),
            mailer,
            avatars,
            cache: Arc::new(MemoryCache::new()),
            contact_create_limiter: RateLimiter::per_minute(config.contact_create_per_minute),
            config,
        })
    }
}

/// Opens the Postgres pool.
pub async fn connect_db(config: &AppConfig) -> anyhow::Result<PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}
