use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::users::repo::UserStore;
use crate::users::repo_types::{NewUser, User, UserChanges};

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    last_id: i64,
}

/// Process-local store. Ids start at 1 and are never reused.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, new: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(AppError::email_taken());
        }

        inner.last_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            user_id: inner.last_id,
            email: new.email,
            password_hash: new.password_hash,
            is_active: true,
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn list(&self, skip: i64, limit: i64) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, user_id: i64) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, user_id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            let taken = inner
                .users
                .values()
                .any(|u| &u.email == email && u.user_id != user_id);
            if taken {
                return Err(AppError::email_taken());
            }
        }

        let Some(user) = inner.users.get_mut(&user_id) else {
            return Ok(None);
        };
        changes.apply_to(user);
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}
