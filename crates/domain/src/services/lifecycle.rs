//! Card issuance, status changes and replacement.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::store::{CardStore, EligibilityChecker, MemberDirectory};
use super::templates::TemplateCatalog;
use super::token::{generate_token, qr_payload};
use super::CardSettings;
use crate::error::{CardError, StoreError};
use crate::models::card::{
    expiry_from, CardType, GenerateCardsRequest, IssuedCard, MemberCard, NewMemberCard,
    ReplaceCardRequest, UpdateCardStatusRequest,
};
use crate::models::card_template::CardTemplate;
use crate::models::member::{Eligibility, Member};
use crate::models::verification::MemberSummary;

/// Attempts to allocate a unique verification token before giving up.
const TOKEN_ATTEMPTS: u32 = 3;

/// Everything a member's app needs to render a card with its QR code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalCardDownload {
    pub card: MemberCard,
    pub member: MemberSummary,
    pub template: CardTemplate,
    pub verification_token: String,
    pub qr_code_data: String,
}

#[derive(Clone)]
pub struct CardLifecycle {
    cards: Arc<dyn CardStore>,
    members: Arc<dyn MemberDirectory>,
    eligibility: Arc<dyn EligibilityChecker>,
    templates: TemplateCatalog,
    settings: Arc<CardSettings>,
}

struct IssueSpec {
    member_id: i64,
    template_id: Uuid,
    card_type: CardType,
    shipping_address: Option<String>,
    expedited_shipping: bool,
    replaces_card_id: Option<Uuid>,
}

impl CardLifecycle {
    pub fn new(
        cards: Arc<dyn CardStore>,
        members: Arc<dyn MemberDirectory>,
        eligibility: Arc<dyn EligibilityChecker>,
        templates: TemplateCatalog,
        settings: Arc<CardSettings>,
    ) -> Self {
        Self {
            cards,
            members,
            eligibility,
            templates,
            settings,
        }
    }

    /// Issues one card per requested type for an eligible member.
    pub async fn generate_cards(
        &self,
        request: GenerateCardsRequest,
    ) -> Result<Vec<MemberCard>, CardError> {
        let member = self.get_member(request.member_id).await?;

        if let Eligibility::Ineligible(reason) = self
            .eligibility
            .check(&member, Utc::now().date_naive())
            .await?
        {
            tracing::info!(member_id = %member.id, reason = %reason, "Card issuance refused");
            return Err(CardError::Ineligible(reason));
        }

        let template = match request.template_id {
            Some(id) => {
                let template = self.templates.get_template(id).await?;
                if !template.is_active {
                    return Err(CardError::not_found("Template"));
                }
                template
            }
            None => {
                self.templates
                    .get_or_create_default(request.company_id.unwrap_or(member.company_id))
                    .await?
            }
        };

        let specs = request
            .card_type
            .card_types()
            .into_iter()
            .map(|card_type| {
                let physical = card_type == CardType::Physical;
                IssueSpec {
                    member_id: member.id,
                    template_id: template.id,
                    card_type,
                    shipping_address: request.shipping_address.clone().filter(|_| physical),
                    expedited_shipping: physical && request.expedited_shipping.unwrap_or(false),
                    replaces_card_id: None,
                }
            })
            .collect();

        self.issue(specs).await
    }

    pub async fn get_card(&self, id: Uuid) -> Result<MemberCard, CardError> {
        self.cards
            .find_card(id)
            .await?
            .ok_or_else(|| CardError::not_found("Card"))
    }

    pub async fn list_member_cards(&self, member_id: i64) -> Result<Vec<MemberCard>, CardError> {
        Ok(self.cards.list_member_cards(member_id).await?)
    }

    /// Applies a status transition. This is the only path that writes
    /// `deactivated_at` and `deactivation_reason`.
    pub async fn update_status(
        &self,
        id: Uuid,
        request: UpdateCardStatusRequest,
    ) -> Result<MemberCard, CardError> {
        let card = self.get_card(id).await?;

        if let Some(expected) = request.expected_version {
            if expected != card.version {
                return Err(CardError::Conflict(format!(
                    "Card is at version {}, expected {}",
                    card.version, expected
                )));
            }
        }

        let change = card.plan_status_change(
            request.status,
            request.reason.as_deref(),
            request.notes.as_deref(),
            Utc::now(),
        )?;
        let updated = self.cards.apply_status_change(id, &change).await?;

        tracing::info!(
            card_id = %id,
            member_id = %updated.member_id,
            from = %card.card_status,
            to = %updated.card_status,
            version = %updated.version,
            "Card status updated"
        );

        Ok(updated)
    }

    /// Issues a new card superseding `id`. The original's status is not touched.
    pub async fn request_replacement(
        &self,
        id: Uuid,
        request: ReplaceCardRequest,
    ) -> Result<MemberCard, CardError> {
        let original = self.get_card(id).await?;

        if let Some(existing) = original.replaced_by_card_id {
            return Err(CardError::Conflict(format!(
                "Card has already been replaced by {}",
                existing
            )));
        }

        let physical = original.card_type == CardType::Physical;
        let replacement = self
            .issue(vec![IssueSpec {
                member_id: original.member_id,
                template_id: original.template_id,
                card_type: original.card_type,
                shipping_address: if physical {
                    request
                        .shipping_address
                        .or_else(|| original.shipping_address.clone())
                } else {
                    None
                },
                expedited_shipping: physical && request.expedited.unwrap_or(false),
                replaces_card_id: Some(original.id),
            }])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CardError::Internal("Replacement card was not stored".to_string()))?;

        tracing::info!(
            card_id = %original.id,
            replacement_id = %replacement.id,
            member_id = %original.member_id,
            original_status = %original.card_status,
            reason = %request.reason.trim(),
            "Replacement card issued"
        );

        Ok(replacement)
    }

    /// Card download for its owner, including the raw token for QR rendering.
    ///
    /// Cards owned by another member are reported as not found.
    pub async fn digital_card(
        &self,
        member_id: i64,
        card_id: Uuid,
    ) -> Result<DigitalCardDownload, CardError> {
        let card = match self.cards.find_card(card_id).await? {
            Some(card) if card.member_id == member_id => card,
            _ => return Err(CardError::not_found("Card")),
        };
        let member = self.get_member(member_id).await?;
        let template = self.templates.get_template(card.template_id).await?;

        let verification_token = card.verification_token.clone();
        let qr_code_data = qr_payload(
            &verification_token,
            self.settings.verification_base_url.as_deref(),
        );

        Ok(DigitalCardDownload {
            card,
            member: member.summary(),
            template,
            verification_token,
            qr_code_data,
        })
    }

    async fn get_member(&self, id: i64) -> Result<Member, CardError> {
        self.members
            .find_member(id)
            .await?
            .ok_or_else(|| CardError::not_found("Member"))
    }

    /// Stores all cards or none. Token collisions regenerate every token of
    /// the set and retry.
    async fn issue(&self, specs: Vec<IssueSpec>) -> Result<Vec<MemberCard>, CardError> {
        let mut attempt = 0;
        let issued = loop {
            attempt += 1;
            let now = Utc::now();
            let new_cards = specs
                .iter()
                .map(|spec| NewMemberCard {
                    member_id: spec.member_id,
                    template_id: spec.template_id,
                    card_type: spec.card_type,
                    card_status: spec.card_type.initial_status(),
                    verification_token: generate_token(),
                    expires_at: expiry_from(now, self.settings.validity_days),
                    shipping_address: spec.shipping_address.clone(),
                    expedited_shipping: spec.expedited_shipping,
                    replaces_card_id: spec.replaces_card_id,
                })
                .collect();

            match self.cards.issue_cards(new_cards).await {
                Ok(issued) => break issued,
                Err(StoreError::Duplicate(what)) if attempt < TOKEN_ATTEMPTS => {
                    tracing::error!(
                        attempt = %attempt,
                        duplicate = %what,
                        "Verification token collision"
                    );
                }
                Err(StoreError::Duplicate(what)) => {
                    tracing::error!(duplicate = %what, "Verification token collision; giving up");
                    return Err(CardError::Internal(
                        "Could not allocate a unique verification token".to_string(),
                    ));
                }
                Err(StoreError::NotFound) => return Err(CardError::not_found("Card")),
                // The replaced card was linked by a concurrent replacement.
                Err(StoreError::VersionConflict) => {
                    return Err(CardError::Conflict(
                        "Card has already been replaced".to_string(),
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        };

        for IssuedCard { card, batch } in &issued {
            tracing::info!(
                card_id = %card.id,
                member_id = %card.member_id,
                card_type = %card.card_type,
                status = %card.card_status,
                batch_id = ?batch.as_ref().map(|b| b.id),
                production_quantity = ?batch.as_ref().map(|b| b.production_quantity),
                "Card issued"
            );
        }

        Ok(issued.into_iter().map(|issued| issued.card).collect())
    }
}
