//! In-process implementation of every storage port for the service tests.
//!
//! All state lives behind one mutex, so each port call is atomic. Fault hooks
//! make selected writes fail.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use uuid::Uuid;

use super::store::{
    BatchStore, CardStore, CoverageEligibility, MemberDirectory, Stores, TemplateStore,
    VerificationLog,
};
use super::token::generate_token;
use crate::error::StoreError;
use crate::models::analytics::{UsageBucket, UsageWindow};
use crate::models::card::{
    expiry_from, CardStatus, CardType, IssuedCard, MemberCard, NewMemberCard, StatusChange,
};
use crate::models::card_template::{CardTemplate, NewCardTemplate, UpdateTemplateRequest};
use crate::models::member::Member;
use crate::models::production_batch::{
    batch_name_for, BatchAdvance, BatchStatus, CardProductionBatch,
};
use crate::models::verification::{
    CardVerificationEvent, NewVerificationEvent, VerificationEventQuery,
};

#[derive(Clone, Default)]
struct State {
    cards: HashMap<Uuid, MemberCard>,
    templates: Vec<CardTemplate>,
    batches: Vec<CardProductionBatch>,
    batch_cards: Vec<(Uuid, Uuid)>,
    events: Vec<CardVerificationEvent>,
    members: HashMap<i64, Member>,
    next_event_id: i64,
    forced_duplicates: u32,
    fail_event_writes: bool,
    fail_last_used: bool,
    fail_batch_claims: bool,
}

impl State {
    /// Joins the pending batch, opening one if none exists.
    fn claim_pending(
        &mut self,
        card_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CardProductionBatch, StoreError> {
        if self.fail_batch_claims {
            return Err(StoreError::Backend("batch store unavailable".to_string()));
        }

        let index = match self
            .batches
            .iter()
            .position(|b| b.batch_status == BatchStatus::Pending)
        {
            Some(index) => index,
            None => {
                let id = Uuid::new_v4();
                self.batches.push(CardProductionBatch {
                    id,
                    batch_name: batch_name_for(id, now),
                    batch_status: BatchStatus::Pending,
                    production_quantity: 0,
                    tracking_number: None,
                    shipped_at: None,
                    delivered_at: None,
                    created_at: now,
                    updated_at: now,
                });
                self.batches.len() - 1
            }
        };

        let batch = &mut self.batches[index];
        batch.production_quantity += 1;
        batch.updated_at = now;
        let batch = batch.clone();

        self.batch_cards.push((batch.id, card_id));
        Ok(batch)
    }

    fn insert_card(
        &mut self,
        new: NewMemberCard,
        now: DateTime<Utc>,
    ) -> Result<IssuedCard, StoreError> {
        if self.forced_duplicates > 0 {
            self.forced_duplicates -= 1;
            return Err(StoreError::Duplicate("verification token".to_string()));
        }
        if self
            .cards
            .values()
            .any(|c| c.verification_token == new.verification_token)
        {
            return Err(StoreError::Duplicate("verification token".to_string()));
        }

        let card = MemberCard {
            id: Uuid::new_v4(),
            member_id: new.member_id,
            template_id: new.template_id,
            card_type: new.card_type,
            card_status: new.card_status,
            verification_token: new.verification_token,
            issued_at: now,
            last_used_at: None,
            deactivated_at: None,
            deactivation_reason: None,
            expires_at: new.expires_at,
            shipping_address: new.shipping_address,
            expedited_shipping: new.expedited_shipping,
            tracking_number: None,
            needs_replacement: false,
            replaces_card_id: new.replaces_card_id,
            replaced_by_card_id: None,
            notes: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        if let Some(original_id) = new.replaces_card_id {
            let original = self
                .cards
                .get_mut(&original_id)
                .ok_or(StoreError::NotFound)?;
            if original.replaced_by_card_id.is_some() {
                return Err(StoreError::VersionConflict);
            }
            original.replaced_by_card_id = Some(card.id);
            original.updated_at = now;
        }

        let batch = if card.card_type == CardType::Physical {
            Some(self.claim_pending(card.id, now)?)
        } else {
            None
        };

        self.cards.insert(card.id, card.clone());
        Ok(IssuedCard { card, batch })
    }
}

/// Input for one physical card with a fresh token.
pub fn physical_card(member_id: i64) -> NewMemberCard {
    NewMemberCard {
        member_id,
        template_id: Uuid::new_v4(),
        card_type: CardType::Physical,
        card_status: CardStatus::Pending,
        verification_token: generate_token(),
        expires_at: expiry_from(Utc::now(), 730),
        shipping_address: Some("1 Main St, Springfield".to_string()),
        expedited_shipping: false,
        replaces_card_id: None,
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundles this store as every port, with coverage-based eligibility.
    pub fn stores(&self) -> Stores {
        let store = Arc::new(self.clone());
        Stores {
            cards: store.clone(),
            templates: store.clone(),
            batches: store.clone(),
            events: store.clone(),
            members: store,
            eligibility: Arc::new(CoverageEligibility),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn upsert_member(&self, member: Member) {
        self.lock().members.insert(member.id, member);
    }

    pub fn remove_member(&self, id: i64) {
        self.lock().members.remove(&id);
    }

    /// Makes the next `count` card inserts fail as token collisions.
    pub fn force_token_collisions(&self, count: u32) {
        self.lock().forced_duplicates = count;
    }

    pub fn set_fail_event_writes(&self, fail: bool) {
        self.lock().fail_event_writes = fail;
    }

    pub fn set_fail_last_used(&self, fail: bool) {
        self.lock().fail_last_used = fail;
    }

    /// Makes every production batch claim fail.
    pub fn set_fail_batch_claims(&self, fail: bool) {
        self.lock().fail_batch_claims = fail;
    }

    pub fn card_count(&self) -> usize {
        self.lock().cards.len()
    }

    pub fn template_count(&self) -> usize {
        self.lock().templates.len()
    }

    pub fn batches(&self) -> Vec<CardProductionBatch> {
        self.lock().batches.clone()
    }

    pub fn events(&self) -> Vec<CardVerificationEvent> {
        self.lock().events.clone()
    }

    /// Batch a card was assigned to, if any.
    pub fn batch_of(&self, card_id: Uuid) -> Option<Uuid> {
        self.lock()
            .batch_cards
            .iter()
            .find(|(_, c)| *c == card_id)
            .map(|(b, _)| *b)
    }

    /// Overwrites a card's expiry, for exercising expiry checks.
    pub fn set_card_expiry(&self, card_id: Uuid, expires_at: DateTime<Utc>) {
        if let Some(card) = self.lock().cards.get_mut(&card_id) {
            card.expires_at = expires_at;
        }
    }
}

#[async_trait]
impl CardStore for InMemoryStore {
    async fn issue_cards(&self, cards: Vec<NewMemberCard>) -> Result<Vec<IssuedCard>, StoreError> {
        let mut state = self.lock();
        let now = Utc::now();

        // Work on a copy so a failure part-way leaves nothing behind.
        let mut staged = state.clone();
        let mut issued = Vec::with_capacity(cards.len());
        for new in cards {
            match staged.insert_card(new, now) {
                Ok(card) => issued.push(card),
                Err(e) => {
                    // Forced collisions are consumed even though the write is discarded.
                    state.forced_duplicates = staged.forced_duplicates;
                    return Err(e);
                }
            }
        }

        *state = staged;
        Ok(issued)
    }

    async fn find_card(&self, id: Uuid) -> Result<Option<MemberCard>, StoreError> {
        Ok(self.lock().cards.get(&id).cloned())
    }

    async fn find_card_by_token(&self, token: &str) -> Result<Option<MemberCard>, StoreError> {
        Ok(self
            .lock()
            .cards
            .values()
            .find(|c| c.verification_token == token)
            .cloned())
    }

    async fn list_member_cards(&self, member_id: i64) -> Result<Vec<MemberCard>, StoreError> {
        let mut cards: Vec<MemberCard> = self
            .lock()
            .cards
            .values()
            .filter(|c| c.member_id == member_id)
            .cloned()
            .collect();
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(cards)
    }

    async fn apply_status_change(
        &self,
        id: Uuid,
        change: &StatusChange,
    ) -> Result<MemberCard, StoreError> {
        let mut state = self.lock();
        let card = state.cards.get_mut(&id).ok_or(StoreError::NotFound)?;
        if card.version != change.expected_version {
            return Err(StoreError::VersionConflict);
        }

        card.card_status = change.status;
        card.deactivated_at = change.deactivated_at;
        card.deactivation_reason = change.deactivation_reason.clone();
        card.needs_replacement = change.needs_replacement;
        card.notes = change.notes.clone();
        card.version += 1;
        card.updated_at = Utc::now();
        Ok(card.clone())
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.fail_last_used {
            return Err(StoreError::Backend("card store unavailable".to_string()));
        }
        let card = state.cards.get_mut(&id).ok_or(StoreError::NotFound)?;
        card.last_used_at = Some(card.last_used_at.map_or(at, |prev| prev.max(at)));
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for InMemoryStore {
    async fn insert_template(&self, new: NewCardTemplate) -> Result<CardTemplate, StoreError> {
        let now = Utc::now();
        let template = CardTemplate {
            id: Uuid::new_v4(),
            company_id: new.company_id,
            name: new.name,
            template_type: new.template_type,
            is_active: new.is_active,
            background_color: new.background_color,
            text_color: new.text_color,
            logo_url: new.logo_url,
            front_layout: new.front_layout,
            back_layout: new.back_layout,
            created_at: now,
            updated_at: now,
        };
        self.lock().templates.push(template.clone());
        Ok(template)
    }

    async fn find_template(&self, id: Uuid) -> Result<Option<CardTemplate>, StoreError> {
        Ok(self.lock().templates.iter().find(|t| t.id == id).cloned())
    }

    async fn list_company_templates(
        &self,
        company_id: i64,
    ) -> Result<Vec<CardTemplate>, StoreError> {
        let mut templates: Vec<CardTemplate> = self
            .lock()
            .templates
            .iter()
            .filter(|t| t.company_id == company_id)
            .cloned()
            .collect();
        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(templates)
    }

    async fn update_template(
        &self,
        id: Uuid,
        update: &UpdateTemplateRequest,
    ) -> Result<Option<CardTemplate>, StoreError> {
        let mut state = self.lock();
        let Some(template) = state.templates.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            template.name = name.clone();
        }
        if let Some(is_active) = update.is_active {
            template.is_active = is_active;
        }
        if let Some(color) = &update.background_color {
            template.background_color = color.clone();
        }
        if let Some(color) = &update.text_color {
            template.text_color = color.clone();
        }
        if let Some(url) = &update.logo_url {
            template.logo_url = Some(url.clone());
        }
        template.updated_at = Utc::now();
        Ok(Some(template.clone()))
    }
}

#[async_trait]
impl BatchStore for InMemoryStore {
    async fn find_batch(&self, id: Uuid) -> Result<Option<CardProductionBatch>, StoreError> {
        Ok(self.lock().batches.iter().find(|b| b.id == id).cloned())
    }

    async fn list_batches(
        &self,
        status: Option<BatchStatus>,
    ) -> Result<Vec<CardProductionBatch>, StoreError> {
        let mut batches: Vec<CardProductionBatch> = self
            .lock()
            .batches
            .iter()
            .filter(|b| status.map_or(true, |s| b.batch_status == s))
            .cloned()
            .collect();
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(batches)
    }

    async fn list_batch_cards(&self, batch_id: Uuid) -> Result<Vec<MemberCard>, StoreError> {
        let state = self.lock();
        let mut cards: Vec<MemberCard> = state
            .batch_cards
            .iter()
            .filter(|(b, _)| *b == batch_id)
            .filter_map(|(_, c)| state.cards.get(c).cloned())
            .collect();
        cards.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(cards)
    }

    async fn apply_advance(
        &self,
        id: Uuid,
        advance: &BatchAdvance,
    ) -> Result<CardProductionBatch, StoreError> {
        let mut state = self.lock();
        let now = Utc::now();

        let batch = state
            .batches
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound)?;
        if batch.batch_status != advance.from {
            return Err(StoreError::VersionConflict);
        }

        batch.batch_status = advance.to;
        batch.tracking_number = advance.tracking_number.clone();
        batch.shipped_at = advance.shipped_at;
        batch.delivered_at = advance.delivered_at;
        batch.updated_at = now;
        let batch = batch.clone();

        if advance.to.propagates_tracking() {
            let card_ids: Vec<Uuid> = state
                .batch_cards
                .iter()
                .filter(|(b, _)| *b == id)
                .map(|(_, c)| *c)
                .collect();
            for card_id in card_ids {
                if let Some(card) = state.cards.get_mut(&card_id) {
                    card.tracking_number = batch.tracking_number.clone();
                    card.updated_at = now;
                }
            }
        }

        Ok(batch)
    }
}

fn matches_query(event: &CardVerificationEvent, query: &VerificationEventQuery) -> bool {
    query.card_id.map_or(true, |id| event.card_id == Some(id))
        && query.member_id.map_or(true, |id| event.member_id == Some(id))
        && query.result.map_or(true, |r| event.verification_result == r)
        && query
            .verification_type
            .map_or(true, |t| event.verification_type == t)
        && query.from.map_or(true, |from| event.created_at >= from)
        && query.to.map_or(true, |to| event.created_at <= to)
        && query
            .before
            .map_or(true, |before| (event.created_at, event.id) < before)
}

#[async_trait]
impl VerificationLog for InMemoryStore {
    async fn record(
        &self,
        new: NewVerificationEvent,
    ) -> Result<CardVerificationEvent, StoreError> {
        let mut state = self.lock();
        if state.fail_event_writes {
            return Err(StoreError::Backend("verification log unavailable".to_string()));
        }

        state.next_event_id += 1;
        let event = CardVerificationEvent {
            id: state.next_event_id,
            card_id: new.card_id,
            member_id: new.member_id,
            verified_by: new.verified_by,
            verification_type: new.verification_type,
            verification_result: new.verification_result,
            location: new.location,
            device_info: new.device_info,
            reason: new.reason,
            // Microsecond precision, matching PostgreSQL timestamps and cursors.
            created_at: Utc::now().trunc_subsecs(6),
        };
        state.events.push(event.clone());
        Ok(event)
    }

    async fn list_events(
        &self,
        query: &VerificationEventQuery,
    ) -> Result<Vec<CardVerificationEvent>, StoreError> {
        let mut events: Vec<CardVerificationEvent> = self
            .lock()
            .events
            .iter()
            .filter(|e| matches_query(e, query))
            .cloned()
            .collect();
        events.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        if let Some(limit) = query.limit {
            events.truncate(limit.max(0) as usize);
        }
        Ok(events)
    }

    async fn usage_buckets(
        &self,
        member_id: Option<i64>,
        window: UsageWindow,
    ) -> Result<Vec<UsageBucket>, StoreError> {
        let query = VerificationEventQuery {
            member_id,
            from: Some(window.start),
            to: Some(window.end),
            ..Default::default()
        };

        let mut counts: BTreeMap<(NaiveDate, &'static str, &'static str), UsageBucket> =
            BTreeMap::new();
        for event in self.lock().events.iter().filter(|e| matches_query(e, &query)) {
            let day = event.created_at.date_naive();
            counts
                .entry((
                    day,
                    event.verification_type.as_str(),
                    event.verification_result.as_str(),
                ))
                .or_insert_with(|| UsageBucket {
                    day,
                    verification_type: event.verification_type,
                    verification_result: event.verification_result,
                    count: 0,
                })
                .count += 1;
        }

        Ok(counts.into_values().collect())
    }
}

#[async_trait]
impl MemberDirectory for InMemoryStore {
    async fn find_member(&self, id: i64) -> Result<Option<Member>, StoreError> {
        Ok(self.lock().members.get(&id).cloned())
    }
}
