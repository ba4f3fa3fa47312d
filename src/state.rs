use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::warn;

use crate::config::AppConfig;
use crate::users::{
    memory::InMemoryUserStore,
    password::Argon2Hasher,
    repo::{PgUserStore, UserStore},
    services::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserService,
    /// Set when backed by Postgres; used for migrations.
    pub db: Option<PgPool>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        Self::from_config(AppConfig::from_env()?).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let hasher = Argon2Hasher::new(&config.password)?;

        let (store, db): (Arc<dyn UserStore>, Option<PgPool>) = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
                    .connect(url)
                    .await
                    .context("connect to database")?;
                (Arc::new(PgUserStore::new(db.clone())) as Arc<dyn UserStore>, Some(db))
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                (Arc::new(InMemoryUserStore::new()) as Arc<dyn UserStore>, None)
            }
        };

        let users = UserService::new(store, hasher, config.max_page_size);
        Ok(Self {
            config: Arc::new(config),
            users,
            db,
        })
    }

    /// In-memory state with a cheap hasher for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig::default();
        let users = UserService::new(
            Arc::new(InMemoryUserStore::new()),
            crate::users::password::test_hasher(),
            config.max_page_size,
        );
        Self {
            config: Arc::new(config),
            users,
            db: None,
        }
    }
}
