use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::{Instrument, Span};
use uuid::Uuid;

use super::{
    is_unique_violation, PostRecord, PostStore, RefreshTokenRecord, RefreshTokenStore, StoreError,
    UserRecord, UserStore,
};

/// Postgres-backed store; schema lives in `sql/schema.sql`.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_span(operation: &'static str, statement: &'static str) -> Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        email: row.try_get("email")?,
        hashed_password: row.try_get("hashed_password")?,
        is_chirpy_red: row.try_get("is_chirpy_red")?,
    })
}

fn refresh_token_from_row(row: &PgRow) -> Result<RefreshTokenRecord, sqlx::Error> {
    Ok(RefreshTokenRecord {
        token: row.try_get("token")?,
        user_id: row.try_get("user_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        expires_at: row.try_get("expires_at")?,
        revoked_at: row.try_get("revoked_at")?,
    })
}

fn post_from_row(row: &PgRow) -> Result<PostRecord, sqlx::Error> {
    Ok(PostRecord {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        body: row.try_get("body")?,
        user_id: row.try_get("user_id")?,
    })
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict
    } else {
        StoreError::Database(err)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<UserRecord, StoreError> {
        let query = r"
            INSERT INTO users (id, created_at, updated_at, email, hashed_password)
            VALUES (gen_random_uuid(), NOW(), NOW(), $1, $2)
            RETURNING id, created_at, updated_at, email, hashed_password, is_chirpy_red
        ";
        let row = sqlx::query(query)
            .bind(email)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .map_err(map_write_error)?;
        Ok(user_from_row(&row)?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let query = r"
            SELECT id, created_at, updated_at, email, hashed_password, is_chirpy_red
            FROM users
            WHERE email = $1
        ";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn update_credentials(
        &self,
        id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let query = r"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, created_at, updated_at, email, hashed_password, is_chirpy_red
        ";
        let row = sqlx::query(query)
            .bind(id)
            .bind(email)
            .bind(hashed_password)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .map_err(map_write_error)?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn upgrade_membership(&self, id: Uuid) -> Result<bool, StoreError> {
        let query = "UPDATE users SET is_chirpy_red = TRUE, updated_at = NOW() WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        // chirps and refresh_tokens cascade from users.
        let query = "DELETE FROM users";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let query = "SELECT 1";
        sqlx::query(query)
            .execute(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO refresh_tokens
                (token, user_id, created_at, updated_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
        ";
        sqlx::query(query)
            .bind(&record.token)
            .bind(record.user_id)
            .bind(record.created_at)
            .bind(record.updated_at)
            .bind(record.expires_at)
            .bind(record.revoked_at)
            .execute(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let query = r"
            SELECT token, user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
        ";
        let row = sqlx::query(query)
            .bind(token)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;
        Ok(row.as_ref().map(refresh_token_from_row).transpose()?)
    }

    async fn touch(&self, token: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let query = "UPDATE refresh_tokens SET updated_at = $2 WHERE token = $1";
        sqlx::query(query)
            .bind(token)
            .bind(at)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await?;
        Ok(())
    }

    async fn set_revoked(&self, token: &str, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let query = r"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $2), updated_at = $2
            WHERE token = $1
        ";
        let result = sqlx::query(query)
            .bind(token)
            .bind(at)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn create(&self, user_id: Uuid, body: &str) -> Result<PostRecord, StoreError> {
        let query = r"
            INSERT INTO chirps (id, created_at, updated_at, body, user_id)
            VALUES (gen_random_uuid(), NOW(), NOW(), $1, $2)
            RETURNING id, created_at, updated_at, body, user_id
        ";
        let row = sqlx::query(query)
            .bind(body)
            .bind(user_id)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await?;
        Ok(post_from_row(&row)?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<PostRecord>, StoreError> {
        let query = "SELECT id, created_at, updated_at, body, user_id FROM chirps WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;
        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn list(&self, author: Option<Uuid>) -> Result<Vec<PostRecord>, StoreError> {
        let query = r"
            SELECT id, created_at, updated_at, body, user_id
            FROM chirps
            WHERE $1::uuid IS NULL OR user_id = $1
            ORDER BY created_at ASC
        ";
        let rows = sqlx::query(query)
            .bind(author)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;
        Ok(rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn find_owner(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        let query = "SELECT user_id FROM chirps WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;
        Ok(row
            .map(|row| row.try_get::<Uuid, _>("user_id"))
            .transpose()?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let query = "DELETE FROM chirps WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
