//! Read-only repository over the members table.

use async_trait::async_trait;
use domain::models::member::Member;
use domain::services::store::MemberDirectory;
use domain::StoreError;
use sqlx::PgPool;

use super::error::store_error;
use crate::entities::MemberEntity;

/// Repository for member lookups.
#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberDirectory for MemberRepository {
    async fn find_member(&self, id: i64) -> Result<Option<Member>, StoreError> {
        let entity = sqlx::query_as::<_, MemberEntity>(
            r#"
            SELECT id, company_id, first_name, last_name, member_type, date_of_birth,
                   coverage_status, coverage_end_date
            FROM members
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(entity.map(Into::into))
    }
}
