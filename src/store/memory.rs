use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    PostRecord, PostStore, RefreshTokenRecord, RefreshTokenStore, StoreError, UserRecord,
    UserStore,
};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, UserRecord>,
    // Kept in insertion order so listing matches creation order.
    posts: Vec<PostRecord>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
}

/// In-process store with the same observable behaviour as [`super::PgStore`],
/// including email uniqueness and cascading deletes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserRecord, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|user| user.email == email) {
            return Err(StoreError::Conflict);
        }
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_chirpy_red: false,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|user| user.email == email).cloned())
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|user| user.email == email && user.id != id)
        {
            return Err(StoreError::Conflict);
        }
        Ok(inner.users.get_mut(&id).map(|user| {
            user.email = email.to_string();
            user.hashed_password = hashed_password.to_string();
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn upgrade_membership(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .users
            .get_mut(&id)
            .map(|user| {
                user.is_chirpy_red = true;
                user.updated_at = Utc::now();
            })
            .is_some())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.users.len() as u64;
        inner.users.clear();
        inner.posts.clear();
        inner.refresh_tokens.clear();
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.refresh_tokens.contains_key(&record.token) {
            return Err(StoreError::Conflict);
        }
        inner.refresh_tokens.insert(record.token.clone(), record);
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.refresh_tokens.get(token).cloned())
    }

    async fn touch(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(record) = inner.refresh_tokens.get_mut(token) {
            record.updated_at = at;
        }
        Ok(())
    }

    async fn set_revoked(&self, token: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .refresh_tokens
            .get_mut(token)
            .map(|record| {
                if record.revoked_at.is_none() {
                    record.revoked_at = Some(at);
                }
                record.updated_at = at;
            })
            .is_some())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create(&self, user_id: Uuid, body: &str) -> Result<PostRecord, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let post = PostRecord {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            body: body.to_string(),
            user_id,
        };
        inner.posts.push(post.clone());
        Ok(post)
    }

    async fn get(&self, id: Uuid) -> Result<Option<PostRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.posts.iter().find(|post| post.id == id).cloned())
    }

    async fn list(&self, author: Option<Uuid>) -> Result<Vec<PostRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .posts
            .iter()
            .filter(|post| author.map_or(true, |author| post.user_id == author))
            .cloned()
            .collect())
    }

    async fn find_owner(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| post.user_id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.posts.len();
        inner.posts.retain(|post| post.id != id);
        Ok(inner.posts.len() != before)
    }
}
