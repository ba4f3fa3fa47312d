use std::sync::Arc;

use anyhow::Context;
use tracing::{info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::users::{
    dto::{CreateUserRequest, UpdateUserRequest},
    password::Argon2Hasher,
    repo::UserStore,
    repo_types::{NewUser, User, UserChanges},
    validation::{normalize_email, validate_page, validate_password},
};

/// User operations: validation, password hashing and store calls.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    hasher: Argon2Hasher,
    max_page_size: i64,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Argon2Hasher, max_page_size: i64) -> Self {
        Self {
            store,
            hasher,
            max_page_size,
        }
    }

    /// Argon2 is CPU bound, keep it off the async workers.
    async fn hash_password(&self, plain: String) -> AppResult<String> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("hash task panicked")??;
        Ok(hash)
    }

    #[instrument(skip(self, req))]
    pub async fn create(&self, req: CreateUserRequest) -> AppResult<User> {
        let email = normalize_email(&req.email)?;
        validate_password(&req.password)?;

        // Cheap pre-check so duplicates do not pay for a hash; the store
        // enforces uniqueness again atomically.
        if self.get_by_email(&email).await?.is_some() {
            warn!("email already registered");
            return Err(AppError::email_taken());
        }

        let password_hash = self.hash_password(req.password).await?;
        let user = self
            .store
            .insert(NewUser {
                email,
                password_hash,
            })
            .await?;

        info!(user_id = user.user_id, "user created");
        Ok(user)
    }

    /// `limit` is clamped to the configured page size.
    pub async fn list(&self, skip: i64, limit: i64) -> AppResult<Vec<User>> {
        validate_page(skip, limit)?;
        self.store.list(skip, limit.min(self.max_page_size)).await
    }

    pub async fn get_by_id(&self, user_id: i64) -> AppResult<User> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound(user_id))
    }

    pub async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.store.find_by_email(email).await
    }

    #[instrument(skip(self, req))]
    pub async fn update(&self, user_id: i64, req: UpdateUserRequest) -> AppResult<User> {
        let email = req.email.as_deref().map(normalize_email).transpose()?;
        if let Some(password) = &req.password {
            validate_password(password)?;
        }

        // Unknown ids must not cost a hash.
        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound(user_id));
        }

        let password_hash = match req.password {
            Some(plain) => Some(self.hash_password(plain).await?),
            None => None,
        };

        let changes = UserChanges {
            email,
            password_hash,
            is_active: req.is_active,
            is_verified: req.is_verified,
        };
        let user = self
            .store
            .update(user_id, changes)
            .await?
            .ok_or(AppError::NotFound(user_id))?;

        info!(user_id, "user updated");
        Ok(user)
    }

    /// Marks the user inactive; the record stays queryable.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, user_id: i64) -> AppResult<User> {
        let user = self
            .store
            .update(user_id, UserChanges::deactivate())
            .await?
            .ok_or(AppError::NotFound(user_id))?;

        info!(user_id, "user deactivated");
        Ok(user)
    }

    /// Checks a plaintext password against the stored hash.
    pub fn verify_password(&self, user: &User, plain: &str) -> AppResult<bool> {
        Ok(self.hasher.verify(plain, &user.password_hash)?)
    }
}
