//! Persistence collaborators.
//!
//! Handlers and the auth core only see the traits below. [`PgStore`] backs a
//! real deployment; [`MemoryStore`] backs tests and throwaway local runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unique constraint violated")]
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub hashed_password: String,
    pub is_chirpy_red: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: Uuid,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// # Errors
    /// [`StoreError::Conflict`] when the email is already registered.
    async fn create_user(&self, email: &str, hashed_password: &str)
        -> Result<UserRecord, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Replace email and password hash. `None` when the user no longer exists.
    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Set the membership flag. Returns `false` when the user does not exist.
    async fn upgrade_membership(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Remove every user together with their posts and refresh tokens.
    async fn delete_all(&self) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    async fn touch(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Mark the token revoked, keeping an earlier revocation time if one exists.
    /// Returns `false` when no such token is stored.
    async fn set_revoked(&self, token: &str, at: DateTime<Utc>) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, user_id: Uuid, body: &str) -> Result<PostRecord, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<PostRecord>, StoreError>;

    /// Posts in creation order, optionally restricted to one author.
    async fn list(&self, author: Option<Uuid>) -> Result<Vec<PostRecord>, StoreError>;

    async fn find_owner(&self, id: Uuid) -> Result<Option<Uuid>, StoreError>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Shared handles to every collaborator, cloned into the router.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
}

impl Stores {
    /// Use a single backend for all three collaborators.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: UserStore + PostStore + RefreshTokenStore + 'static,
    {
        let backend = Arc::new(backend);
        Self {
            users: backend.clone(),
            posts: backend.clone(),
            refresh_tokens: backend,
        }
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
