use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::users::repo_types::{NewUser, User, UserChanges};

/// Persistence for user records. Each call is one atomic unit of work.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `Conflict` if the email is taken.
    async fn insert(&self, new: NewUser) -> AppResult<User>;

    /// Users in creation order.
    async fn list(&self, skip: i64, limit: i64) -> AppResult<Vec<User>>;

    async fn find_by_id(&self, user_id: i64) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Apply `changes` and refresh `updated_at`. `Ok(None)` if the id is unknown;
    /// `Conflict` if the new email belongs to another user.
    async fn update(&self, user_id: i64, changes: UserChanges) -> AppResult<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_write_err(e: sqlx::Error) -> AppError {
    match &e {
        // users_email_key closes the check-then-insert race
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::email_taken(),
        _ => AppError::Internal(anyhow::Error::new(e).context("write user")),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new: NewUser) -> AppResult<User> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let taken: Option<i64> =
            sqlx::query_scalar(r#"SELECT user_id FROM users WHERE email = $1"#)
                .bind(&new.email)
                .fetch_optional(&mut *tx)
                .await
                .context("check email")?;
        if taken.is_some() {
            return Err(AppError::email_taken());
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING user_id, email, password_hash, is_active, is_verified, created_at, updated_at
            "#,
        )
        .bind(&new.email)
        .bind(&new.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_err)?;

        tx.commit().await.context("commit tx")?;
        Ok(user)
    }

    async fn list(&self, skip: i64, limit: i64) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, is_active, is_verified, created_at, updated_at
            FROM users
            ORDER BY user_id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(skip)
        .fetch_all(&self.db)
        .await
        .context("list users")?;
        Ok(rows)
    }

    async fn find_by_id(&self, user_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, is_active, is_verified, created_at, updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, is_active, is_verified, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn update(&self, user_id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let exists: Option<i64> =
            sqlx::query_scalar(r#"SELECT user_id FROM users WHERE user_id = $1 FOR UPDATE"#)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .context("lock user")?;
        if exists.is_none() {
            return Ok(None);
        }

        if let Some(email) = &changes.email {
            let owner: Option<i64> = sqlx::query_scalar(
                r#"SELECT user_id FROM users WHERE email = $1 AND user_id <> $2"#,
            )
            .bind(email)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .context("check email")?;
            if owner.is_some() {
                return Err(AppError::email_taken());
            }
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email         = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                is_active     = COALESCE($4, is_active),
                is_verified   = COALESCE($5, is_verified),
                updated_at    = now()
            WHERE user_id = $1
            RETURNING user_id, email, password_hash, is_active, is_verified, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.is_active)
        .bind(changes.is_verified)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_err)?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(user))
    }
}
