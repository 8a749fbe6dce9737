//! Provider and admin API keys.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A row of `api_keys`. Only the SHA-256 of the raw key is stored.
#[derive(Debug, Clone, FromRow)]
pub struct ApiKeyEntity {
    pub id: i64,
    pub key_hash: String,
    /// First characters after `ak_`, shown in admin listings.
    pub key_prefix: String,
    pub name: String,
    pub is_active: bool,
    /// Admin keys manage templates and batches and read analytics.
    pub is_admin: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKeyEntity {
    /// A key authenticates while it is active and unexpired at `at`.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.map_or(true, |expires_at| expires_at > at)
    }
}
