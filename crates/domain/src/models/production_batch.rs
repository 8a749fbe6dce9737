//! Production batch domain model for physical card fulfillment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::CardError;

/// Fulfillment status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProduction,
    Shipped,
    Delivered,
    Cancelled,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::InProduction => "in_production",
            BatchStatus::Shipped => "shipped",
            BatchStatus::Delivered => "delivered",
            BatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Delivered | BatchStatus::Cancelled)
    }

    /// Forward-only transitions plus cancellation before shipment.
    pub fn can_transition_to(&self, to: BatchStatus) -> bool {
        use BatchStatus::*;
        matches!(
            (self, to),
            (Pending, InProduction)
                | (InProduction, Shipped)
                | (Shipped, Delivered)
                | (Pending | InProduction, Cancelled)
        )
    }

    /// Whether cards in a batch with this status carry the batch tracking number.
    pub fn propagates_tracking(&self) -> bool {
        matches!(self, BatchStatus::Shipped | BatchStatus::Delivered)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A shipping/manufacturing group of physical cards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProductionBatch {
    pub id: Uuid,
    pub batch_name: String,
    pub batch_status: BatchStatus,
    pub production_quantity: i32,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CardProductionBatch {
    /// Plans a status advance, validating the transition and tracking requirements.
    pub fn plan_advance(
        &self,
        to: BatchStatus,
        tracking_number: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<BatchAdvance, CardError> {
        if !self.batch_status.can_transition_to(to) {
            return Err(CardError::invalid_transition(self.batch_status, to));
        }

        let tracking_number = tracking_number
            .map(str::to_string)
            .or_else(|| self.tracking_number.clone());

        if to == BatchStatus::Shipped && tracking_number.is_none() {
            return Err(CardError::Validation(
                "trackingNumber is required to mark a batch shipped".to_string(),
            ));
        }

        Ok(BatchAdvance {
            from: self.batch_status,
            to,
            tracking_number,
            shipped_at: if to == BatchStatus::Shipped {
                Some(now)
            } else {
                self.shipped_at
            },
            delivered_at: if to == BatchStatus::Delivered {
                Some(now)
            } else {
                self.delivered_at
            },
        })
    }
}

/// A planned, validated batch status write.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchAdvance {
    /// The write only applies if the stored status still equals `from`.
    pub from: BatchStatus,
    pub to: BatchStatus,
    pub tracking_number: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// A batch after a status write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedBatch {
    #[serde(flatten)]
    pub batch: CardProductionBatch,
    /// Cards still `pending` when their batch was cancelled. Nothing re-queues
    /// them; each needs a replacement.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stranded_card_ids: Vec<Uuid>,
}

/// Deterministic batch name derived from creation date and ID.
pub fn batch_name_for(id: Uuid, created_at: DateTime<Utc>) -> String {
    let simple = id.simple().to_string();
    format!(
        "BATCH-{}-{}",
        created_at.format("%Y%m%d"),
        &simple[..8].to_uppercase()
    )
}

/// Request to advance a batch.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceBatchRequest {
    pub status: BatchStatus,

    #[validate(custom(function = "shared::validation::validate_tracking_number"))]
    pub tracking_number: Option<String>,
}

/// Query parameters for listing batches.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBatchesQuery {
    pub status: Option<BatchStatus>,
}
