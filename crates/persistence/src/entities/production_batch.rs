//! Production batch entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::production_batch::{BatchStatus, CardProductionBatch};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for batch status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "batch_status", rename_all = "snake_case")]
pub enum BatchStatusDb {
    Pending,
    InProduction,
    Shipped,
    Delivered,
    Cancelled,
}

impl From<BatchStatus> for BatchStatusDb {
    fn from(status: BatchStatus) -> Self {
        match status {
            BatchStatus::Pending => BatchStatusDb::Pending,
            BatchStatus::InProduction => BatchStatusDb::InProduction,
            BatchStatus::Shipped => BatchStatusDb::Shipped,
            BatchStatus::Delivered => BatchStatusDb::Delivered,
            BatchStatus::Cancelled => BatchStatusDb::Cancelled,
        }
    }
}

impl From<BatchStatusDb> for BatchStatus {
    fn from(status: BatchStatusDb) -> Self {
        match status {
            BatchStatusDb::Pending => BatchStatus::Pending,
            BatchStatusDb::InProduction => BatchStatus::InProduction,
            BatchStatusDb::Shipped => BatchStatus::Shipped,
            BatchStatusDb::Delivered => BatchStatus::Delivered,
            BatchStatusDb::Cancelled => BatchStatus::Cancelled,
        }
    }
}

/// Database row mapping for the card_production_batches table.
#[derive(Debug, Clone, FromRow)]
pub struct ProductionBatchEntity {
    pub id: Uuid,
    pub batch_name: String,
    pub batch_status: BatchStatusDb,
    pub production_quantity: i32,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductionBatchEntity> for CardProductionBatch {
    fn from(entity: ProductionBatchEntity) -> Self {
        Self {
            id: entity.id,
            batch_name: entity.batch_name,
            batch_status: entity.batch_status.into(),
            production_quantity: entity.production_quantity,
            tracking_number: entity.tracking_number,
            shipped_at: entity.shipped_at,
            delivered_at: entity.delivered_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
