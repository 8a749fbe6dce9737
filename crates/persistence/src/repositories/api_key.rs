//! Repository for provider and admin API keys.

use chrono::{DateTime, Utc};
use domain::StoreError;
use sqlx::PgPool;

use super::error::store_error;
use crate::entities::ApiKeyEntity;

/// Repository for API key operations.
#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Looks a key up by the SHA-256 hex digest of its full value.
    pub async fn find_by_key_hash(
        &self,
        key_hash: &str,
    ) -> Result<Option<ApiKeyEntity>, StoreError> {
        sqlx::query_as::<_, ApiKeyEntity>(
            r#"
            SELECT id, key_hash, key_prefix, name, is_active, is_admin,
                   last_used_at, created_at, expires_at
            FROM api_keys
            WHERE key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)
    }

    /// Stores a new key. Only the hash and display prefix are persisted.
    pub async fn create(
        &self,
        key_hash: &str,
        key_prefix: &str,
        name: &str,
        is_admin: bool,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ApiKeyEntity, StoreError> {
        sqlx::query_as::<_, ApiKeyEntity>(
            r#"
            INSERT INTO api_keys (key_hash, key_prefix, name, is_admin, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, key_hash, key_prefix, name, is_active, is_admin,
                      last_used_at, created_at, expires_at
            "#,
        )
        .bind(key_hash)
        .bind(key_prefix)
        .bind(name)
        .bind(is_admin)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)
    }

    /// Called off the request path after successful authentication.
    pub async fn update_last_used(&self, key_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
            .bind(key_id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
