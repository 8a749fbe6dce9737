//! Storage ports used by the card services.
//!
//! PostgreSQL implementations live in the persistence crate. The service
//! tests run against an in-process implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::analytics::{UsageBucket, UsageWindow};
use crate::models::card::{IssuedCard, MemberCard, NewMemberCard, StatusChange};
use crate::models::card_template::{CardTemplate, NewCardTemplate, UpdateTemplateRequest};
use crate::models::member::{Eligibility, Member};
use crate::models::production_batch::{BatchAdvance, BatchStatus, CardProductionBatch};
use crate::models::verification::{
    CardVerificationEvent, NewVerificationEvent, VerificationEventQuery,
};

/// Member card persistence.
#[async_trait]
pub trait CardStore: Send + Sync {
    /// Stores a set of cards as one unit of work: either every card is stored
    /// or none is.
    ///
    /// Each physical card joins the pending production batch (opened if none
    /// exists) in the same unit of work. When `replaces_card_id` is set, the
    /// original's `replaced_by_card_id` is written only if it is still unset.
    ///
    /// Returns `StoreError::Duplicate` if a verification token already exists,
    /// `StoreError::NotFound` if a replaced card does not exist and
    /// `StoreError::VersionConflict` if it was already replaced.
    async fn issue_cards(&self, cards: Vec<NewMemberCard>) -> Result<Vec<IssuedCard>, StoreError>;

    async fn find_card(&self, id: Uuid) -> Result<Option<MemberCard>, StoreError>;

    async fn find_card_by_token(&self, token: &str) -> Result<Option<MemberCard>, StoreError>;

    /// Cards owned by a member, newest first.
    async fn list_member_cards(&self, member_id: i64) -> Result<Vec<MemberCard>, StoreError>;

    /// Persists a planned status change if the stored version still equals
    /// `change.expected_version`, bumping the version.
    async fn apply_status_change(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> Result<MemberCard, StoreError>;

    /// Records a successful use. Never moves `last_used_at` backwards.
    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Card template persistence.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn insert_template(&self, template: NewCardTemplate)
        -> Result<CardTemplate, StoreError>;

    async fn find_template(&self, id: Uuid) -> Result<Option<CardTemplate>, StoreError>;

    /// Templates of a company ordered by `(created_at, id)`.
    async fn list_company_templates(
        &self,
        company_id: i64,
    ) -> Result<Vec<CardTemplate>, StoreError>;

    async fn update_template(
        &self,
        id: Uuid,
        update: &UpdateTemplateRequest,
    ) -> Result<Option<CardTemplate>, StoreError>;
}

/// Production batch persistence.
#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn find_batch(&self, id: Uuid) -> Result<Option<CardProductionBatch>, StoreError>;

    /// Batches newest first, optionally filtered by status.
    async fn list_batches(
        &self,
        status: Option<BatchStatus>,
    ) -> Result<Vec<CardProductionBatch>, StoreError>;

    async fn list_batch_cards(&self, batch_id: Uuid) -> Result<Vec<MemberCard>, StoreError>;

    /// Persists a planned advance if the stored status still equals
    /// `advance.from`. When the target status carries tracking, every card in
    /// the batch receives the batch tracking number in the same unit of work.
    async fn apply_advance(
        &self,
        id: Uuid,
        advance: &BatchAdvance,
    ) -> Result<CardProductionBatch, StoreError>;
}

/// Append-only verification event log.
#[async_trait]
pub trait VerificationLog: Send + Sync {
    async fn record(&self, event: NewVerificationEvent)
        -> Result<CardVerificationEvent, StoreError>;

    /// Events matching the query, newest first by `(created_at, id)`.
    async fn list_events(
        &self,
        query: &VerificationEventQuery,
    ) -> Result<Vec<CardVerificationEvent>, StoreError>;

    /// Event counts grouped by day, type and result within the window.
    async fn usage_buckets(
        &self,
        member_id: Option<i64>,
        window: UsageWindow,
    ) -> Result<Vec<UsageBucket>, StoreError>;
}

/// Read access to the external member store.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn find_member(&self, id: i64) -> Result<Option<Member>, StoreError>;
}

/// Business-rule eligibility check for a member.
#[async_trait]
pub trait EligibilityChecker: Send + Sync {
    async fn check(&self, member: &Member, on: NaiveDate) -> Result<Eligibility, StoreError>;
}

/// Eligibility derived from the coverage fields on the member record.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageEligibility;

#[async_trait]
impl EligibilityChecker for CoverageEligibility {
    async fn check(&self, member: &Member, on: NaiveDate) -> Result<Eligibility, StoreError> {
        Ok(member.eligibility_on(on))
    }
}

/// The full set of ports a service bundle needs.
#[derive(Clone)]
pub struct Stores {
    pub cards: Arc<dyn CardStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub batches: Arc<dyn BatchStore>,
    pub events: Arc<dyn VerificationLog>,
    pub members: Arc<dyn MemberDirectory>,
    pub eligibility: Arc<dyn EligibilityChecker>,
}
