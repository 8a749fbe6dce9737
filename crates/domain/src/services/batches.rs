//! Production batch tracking for physical cards.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::store::BatchStore;
use crate::error::CardError;
use crate::models::card::{CardStatus, MemberCard};
use crate::models::production_batch::{
    AdvanceBatchRequest, AdvancedBatch, BatchStatus, CardProductionBatch,
};

#[derive(Clone)]
pub struct BatchTracker {
    store: Arc<dyn BatchStore>,
}

impl BatchTracker {
    pub fn new(store: Arc<dyn BatchStore>) -> Self {
        Self { store }
    }

    pub async fn get_batch(&self, id: Uuid) -> Result<CardProductionBatch, CardError> {
        self.store
            .find_batch(id)
            .await?
            .ok_or_else(|| CardError::not_found("Batch"))
    }

    pub async fn list_batches(
        &self,
        status: Option<BatchStatus>,
    ) -> Result<Vec<CardProductionBatch>, CardError> {
        Ok(self.store.list_batches(status).await?)
    }

    pub async fn list_batch_cards(&self, id: Uuid) -> Result<Vec<MemberCard>, CardError> {
        self.get_batch(id).await?;
        Ok(self.store.list_batch_cards(id).await?)
    }

    /// Advances a batch. Shipping requires a tracking number, which is then
    /// propagated to every card in the batch.
    ///
    /// Cancelling reports the batch's cards that are still pending.
    pub async fn advance_status(
        &self,
        id: Uuid,
        request: AdvanceBatchRequest,
    ) -> Result<AdvancedBatch, CardError> {
        let batch = self.get_batch(id).await?;
        let advance =
            batch.plan_advance(request.status, request.tracking_number.as_deref(), Utc::now())?;

        let updated = self.store.apply_advance(id, &advance).await?;
        tracing::info!(
            batch_id = %id,
            from = %advance.from,
            to = %advance.to,
            tracking_number = ?updated.tracking_number,
            "Production batch advanced"
        );

        let stranded_card_ids = if advance.to == BatchStatus::Cancelled {
            self.pending_cards(id).await?
        } else {
            Vec::new()
        };
        if !stranded_card_ids.is_empty() {
            tracing::warn!(
                batch_id = %id,
                cards = stranded_card_ids.len(),
                card_ids = ?stranded_card_ids,
                "Cancelled batch left pending cards unproduced"
            );
        }

        Ok(AdvancedBatch {
            batch: updated,
            stranded_card_ids,
        })
    }

    async fn pending_cards(&self, id: Uuid) -> Result<Vec<Uuid>, CardError> {
        Ok(self
            .store
            .list_batch_cards(id)
            .await?
            .into_iter()
            .filter(|card| card.card_status == CardStatus::Pending)
            .map(|card| card.id)
            .collect())
    }
}
