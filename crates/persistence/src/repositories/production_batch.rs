//! Repository for card production batch database operations.

use async_trait::async_trait;
use chrono::Utc;
use domain::models::card::MemberCard;
use domain::models::production_batch::{
    batch_name_for, BatchAdvance, BatchStatus, CardProductionBatch,
};
use domain::services::store::BatchStore;
use domain::StoreError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::error::store_error;
use crate::entities::member_card::MEMBER_CARD_COLUMNS;
use crate::entities::production_batch::BatchStatusDb;
use crate::entities::{MemberCardEntity, ProductionBatchEntity};

/// Attempts to claim the pending batch before giving up.
const CLAIM_ATTEMPTS: u32 = 5;

/// Repository for production batch operations.
#[derive(Clone)]
pub struct BatchRepository {
    pool: PgPool,
}

impl BatchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Ensures a pending batch exists, then increments it.
///
/// The partial unique index on pending batches makes the insert a no-op
/// when another transaction already opened one. The increment can still
/// miss if that batch left pending in between, in which case it returns
/// `None`.
async fn claim_pending(
    tx: &mut Transaction<'_, Postgres>,
) -> Result<Option<ProductionBatchEntity>, StoreError> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO card_production_batches (id, batch_name, batch_status, production_quantity)
        VALUES ($1, $2, 'pending', 0)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(id)
    .bind(batch_name_for(id, Utc::now()))
    .execute(&mut **tx)
    .await
    .map_err(store_error)?;

    sqlx::query_as::<_, ProductionBatchEntity>(
        r#"
        UPDATE card_production_batches
        SET production_quantity = production_quantity + 1, updated_at = NOW()
        WHERE batch_status = 'pending'
        RETURNING id, batch_name, batch_status, production_quantity, tracking_number,
                  shipped_at, delivered_at, created_at, updated_at
        "#,
    )
    .fetch_optional(&mut **tx)
    .await
    .map_err(store_error)
}

/// Adds a card to the pending batch inside the caller's transaction.
///
/// Each statement sees the latest committed batches, so a claim that missed
/// is retried within the same transaction.
pub(crate) async fn join_pending_batch(
    tx: &mut Transaction<'_, Postgres>,
    card_id: Uuid,
) -> Result<CardProductionBatch, StoreError> {
    for attempt in 1..=CLAIM_ATTEMPTS {
        let Some(batch) = claim_pending(tx).await? else {
            tracing::debug!(attempt, "Pending batch moved on, retrying claim");
            continue;
        };

        sqlx::query("INSERT INTO batch_cards (batch_id, card_id) VALUES ($1, $2)")
            .bind(batch.id)
            .bind(card_id)
            .execute(&mut **tx)
            .await
            .map_err(store_error)?;

        return Ok(batch.into());
    }

    Err(StoreError::Backend(
        "could not claim a pending production batch".to_string(),
    ))
}

#[async_trait]
impl BatchStore for BatchRepository {
    async fn find_batch(&self, id: Uuid) -> Result<Option<CardProductionBatch>, StoreError> {
        let entity = sqlx::query_as::<_, ProductionBatchEntity>(
            r#"
            SELECT id, batch_name, batch_status, production_quantity, tracking_number,
                   shipped_at, delivered_at, created_at, updated_at
            FROM card_production_batches
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(entity.map(Into::into))
    }

    async fn list_batches(
        &self,
        status: Option<BatchStatus>,
    ) -> Result<Vec<CardProductionBatch>, StoreError> {
        let rows = sqlx::query_as::<_, ProductionBatchEntity>(
            r#"
            SELECT id, batch_name, batch_status, production_quantity, tracking_number,
                   shipped_at, delivered_at, created_at, updated_at
            FROM card_production_batches
            WHERE ($1::batch_status IS NULL OR batch_status = $1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(status.map(BatchStatusDb::from))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_batch_cards(&self, batch_id: Uuid) -> Result<Vec<MemberCard>, StoreError> {
        let sql = format!(
            r#"
            SELECT {MEMBER_CARD_COLUMNS}
            FROM member_cards
            WHERE id IN (SELECT card_id FROM batch_cards WHERE batch_id = $1)
            ORDER BY created_at ASC, id ASC
            "#
        );
        let rows = sqlx::query_as::<_, MemberCardEntity>(&sql)
            .bind(batch_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn apply_advance(
        &self,
        id: Uuid,
        advance: &BatchAdvance,
    ) -> Result<CardProductionBatch, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let updated = sqlx::query_as::<_, ProductionBatchEntity>(
            r#"
            UPDATE card_production_batches
            SET batch_status = $3,
                tracking_number = $4,
                shipped_at = $5,
                delivered_at = $6,
                updated_at = NOW()
            WHERE id = $1 AND batch_status = $2
            RETURNING id, batch_name, batch_status, production_quantity, tracking_number,
                      shipped_at, delivered_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(BatchStatusDb::from(advance.from))
        .bind(BatchStatusDb::from(advance.to))
        .bind(&advance.tracking_number)
        .bind(advance.shipped_at)
        .bind(advance.delivered_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_error)?;

        let Some(batch) = updated else {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM card_production_batches WHERE id = $1)",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_error)?;

            return Err(if exists {
                StoreError::VersionConflict
            } else {
                StoreError::NotFound
            });
        };

        if advance.to.propagates_tracking() {
            let propagated = sqlx::query(
                r#"
                UPDATE member_cards
                SET tracking_number = $2, updated_at = NOW()
                WHERE id IN (SELECT card_id FROM batch_cards WHERE batch_id = $1)
                "#,
            )
            .bind(id)
            .bind(&batch.tracking_number)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

            tracing::debug!(
                batch_id = %id,
                cards = propagated.rows_affected(),
                "Propagated tracking number to batch cards"
            );
        }

        tx.commit().await.map_err(store_error)?;
        Ok(batch.into())
    }
}
