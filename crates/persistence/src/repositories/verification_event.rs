//! Repository for the append-only verification event log.

use async_trait::async_trait;
use domain::models::analytics::{UsageBucket, UsageWindow};
use domain::models::verification::{
    CardVerificationEvent, NewVerificationEvent, VerificationEventQuery,
};
use domain::services::store::VerificationLog;
use domain::StoreError;
use sqlx::PgPool;

use super::error::store_error;
use crate::entities::verification_event::{VerificationResultDb, VerificationTypeDb};
use crate::entities::{UsageBucketEntity, VerificationEventEntity};
use crate::metrics::QueryTimer;

/// Repository for verification event operations.
#[derive(Clone)]
pub struct VerificationEventRepository {
    pool: PgPool,
}

impl VerificationEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VerificationLog for VerificationEventRepository {
    async fn record(
        &self,
        event: NewVerificationEvent,
    ) -> Result<CardVerificationEvent, StoreError> {
        let entity = sqlx::query_as::<_, VerificationEventEntity>(
            r#"
            INSERT INTO card_verification_events (
                card_id, member_id, verified_by, verification_type, verification_result,
                location, device_info, reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, card_id, member_id, verified_by, verification_type,
                      verification_result, location, device_info, reason, created_at
            "#,
        )
        .bind(event.card_id)
        .bind(event.member_id)
        .bind(&event.verified_by)
        .bind(VerificationTypeDb::from(event.verification_type))
        .bind(VerificationResultDb::from(event.verification_result))
        .bind(&event.location)
        .bind(&event.device_info)
        .bind(&event.reason)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(entity.into())
    }

    async fn list_events(
        &self,
        query: &VerificationEventQuery,
    ) -> Result<Vec<CardVerificationEvent>, StoreError> {
        let timer = QueryTimer::start("list_verification_events");
        let (before_at, before_id) = query.before.unzip();

        let result = sqlx::query_as::<_, VerificationEventEntity>(
            r#"
            SELECT id, card_id, member_id, verified_by, verification_type,
                   verification_result, location, device_info, reason, created_at
            FROM card_verification_events
            WHERE ($1::UUID IS NULL OR card_id = $1)
              AND ($2::BIGINT IS NULL OR member_id = $2)
              AND ($3::verification_result IS NULL OR verification_result = $3)
              AND ($4::verification_type IS NULL OR verification_type = $4)
              AND ($5::TIMESTAMPTZ IS NULL OR created_at >= $5)
              AND ($6::TIMESTAMPTZ IS NULL OR created_at <= $6)
              AND ($7::TIMESTAMPTZ IS NULL OR (created_at, id) < ($7, $8))
            ORDER BY created_at DESC, id DESC
            LIMIT $9
            "#,
        )
        .bind(query.card_id)
        .bind(query.member_id)
        .bind(query.result.map(VerificationResultDb::from))
        .bind(query.verification_type.map(VerificationTypeDb::from))
        .bind(query.from)
        .bind(query.to)
        .bind(before_at)
        .bind(before_id)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await;
        let result = timer.finish(result);

        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn usage_buckets(
        &self,
        member_id: Option<i64>,
        window: UsageWindow,
    ) -> Result<Vec<UsageBucket>, StoreError> {
        let timer = QueryTimer::start("verification_usage_buckets");
        let result = sqlx::query_as::<_, UsageBucketEntity>(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::DATE AS day,
                   verification_type,
                   verification_result,
                   COUNT(*) AS count
            FROM card_verification_events
            WHERE created_at >= $1
              AND created_at <= $2
              AND ($3::BIGINT IS NULL OR member_id = $3)
            GROUP BY 1, 2, 3
            ORDER BY 1, 2, 3
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(member_id)
        .fetch_all(&self.pool)
        .await;
        let result = timer.finish(result);

        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
