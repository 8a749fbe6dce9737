//! Point-of-care card verification.
//!
//! Every call re-resolves the token and re-checks card and member state;
//! nothing is cached. Expected failures (unknown token, inactive card,
//! lapsed coverage) are returned as [`VerificationOutcome`] values.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use shared::pagination::{clamp_limit, decode_cursor, encode_cursor};
use uuid::Uuid;

use super::store::{CardStore, EligibilityChecker, MemberDirectory, VerificationLog};
use super::token::token_from_qr;
use crate::error::CardError;
use crate::models::card::{CardStatus, MemberCard};
use crate::models::member::Eligibility;
use crate::models::verification::{
    FailureCode, NewVerificationEvent, VerificationEventQuery, VerificationOutcome,
    VerificationPage, VerificationResult, VerifyCardRequest,
};

#[derive(Clone)]
pub struct CardVerifier {
    cards: Arc<dyn CardStore>,
    members: Arc<dyn MemberDirectory>,
    eligibility: Arc<dyn EligibilityChecker>,
    events: Arc<dyn VerificationLog>,
    min_response: Duration,
}

impl CardVerifier {
    pub fn new(
        cards: Arc<dyn CardStore>,
        members: Arc<dyn MemberDirectory>,
        eligibility: Arc<dyn EligibilityChecker>,
        events: Arc<dyn VerificationLog>,
        min_response: Duration,
    ) -> Self {
        Self {
            cards,
            members,
            eligibility,
            events,
            min_response,
        }
    }

    /// Verifies a presented card and records the attempt.
    ///
    /// Every outcome is padded to at least the configured minimum response
    /// time so unknown and inactive tokens are not distinguishable by latency.
    pub async fn verify(&self, request: &VerifyCardRequest) -> VerificationOutcome {
        let started = tokio::time::Instant::now();
        let outcome = self.evaluate(request).await;

        if let Some(remaining) = self.min_response.checked_sub(started.elapsed()) {
            tokio::time::sleep(remaining).await;
        }

        tracing::info!(
            verified_by = %request.provider_id,
            verification_type = %request.verification_type,
            valid = %outcome.valid,
            failure_code = ?outcome.failure_code,
            card_id = ?outcome.card.as_ref().map(|c| c.id),
            "Card verification completed"
        );

        outcome
    }

    async fn evaluate(&self, request: &VerifyCardRequest) -> VerificationOutcome {
        let lookup = match token_from_qr(&request.qr_code_data) {
            Some(token) => self.cards.find_card_by_token(token).await,
            None => Ok(None),
        };

        let card = match lookup {
            Ok(Some(card)) => card,
            Ok(None) => {
                return self
                    .fail(request, FailureCode::CardNotFound, None, None)
                    .await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Card lookup failed during verification");
                return internal_failure(None);
            }
        };

        let now = Utc::now();

        if card.card_status != CardStatus::Active {
            let (code, reason) = status_failure(card.card_status);
            return self.fail(request, code, Some(reason), Some(card)).await;
        }

        if card.is_past_expiry(now) {
            return self
                .fail(request, FailureCode::CardExpired, None, Some(card))
                .await;
        }

        let member = match self.members.find_member(card.member_id).await {
            Ok(Some(member)) => member,
            Ok(None) => {
                tracing::warn!(
                    card_id = %card.id,
                    member_id = %card.member_id,
                    "Card references a missing member"
                );
                return VerificationOutcome::failure(
                    FailureCode::MemberNotFound,
                    FailureCode::MemberNotFound.default_reason(),
                    Some(card),
                );
            }
            Err(e) => {
                tracing::error!(card_id = %card.id, error = %e, "Member lookup failed during verification");
                return internal_failure(Some(card));
            }
        };

        match self.eligibility.check(&member, now.date_naive()).await {
            Ok(Eligibility::Eligible) => {}
            Ok(Eligibility::Ineligible(reason)) => {
                return self
                    .fail(request, FailureCode::MemberIneligible, Some(reason), Some(card))
                    .await;
            }
            Err(e) => {
                tracing::error!(card_id = %card.id, error = %e, "Eligibility check failed during verification");
                return internal_failure(Some(card));
            }
        }

        let event = event_for(request, Some(&card), VerificationResult::Success, None);
        if let Err(e) = self.events.record(event).await {
            tracing::error!(card_id = %card.id, error = %e, "Failed to record verification event");
            return internal_failure(Some(card));
        }

        if let Err(e) = self.cards.touch_last_used(card.id, now).await {
            tracing::error!(card_id = %card.id, error = %e, "Failed to update card last use");
            return internal_failure(Some(card));
        }

        let mut card = card;
        card.last_used_at = Some(card.last_used_at.map_or(now, |prev| prev.max(now)));

        VerificationOutcome::success(card, member.summary())
    }

    /// Records a failed event and builds the matching outcome. A failure to
    /// record is logged; the caller still gets the failure outcome.
    async fn fail(
        &self,
        request: &VerifyCardRequest,
        code: FailureCode,
        reason: Option<String>,
        card: Option<MemberCard>,
    ) -> VerificationOutcome {
        let reason = reason.unwrap_or_else(|| code.default_reason().to_string());
        let event = event_for(
            request,
            card.as_ref(),
            VerificationResult::Failed,
            Some(reason.clone()),
        );

        if let Err(e) = self.events.record(event).await {
            tracing::error!(
                card_id = ?card.as_ref().map(|c| c.id),
                error = %e,
                "Failed to record failed verification event"
            );
        }

        VerificationOutcome::failure(code, reason, card)
    }

    /// Verification history for one card, newest first.
    pub async fn card_history(
        &self,
        card_id: Uuid,
        cursor: Option<&str>,
        limit: Option<u32>,
    ) -> Result<VerificationPage, CardError> {
        if self.cards.find_card(card_id).await?.is_none() {
            return Err(CardError::not_found("Card"));
        }

        let query = VerificationEventQuery {
            card_id: Some(card_id),
            ..Default::default()
        };
        fetch_page(self.events.as_ref(), query, cursor, limit).await
    }
}

/// Reads one page of events using keyset pagination on `(created_at, id)`.
pub(crate) async fn fetch_page(
    events: &dyn VerificationLog,
    mut query: VerificationEventQuery,
    cursor: Option<&str>,
    limit: Option<u32>,
) -> Result<VerificationPage, CardError> {
    let limit = clamp_limit(limit) as usize;

    query.before = match cursor {
        Some(cursor) => Some(
            decode_cursor(cursor).map_err(|e| CardError::Validation(e.to_string()))?,
        ),
        None => None,
    };
    query.limit = Some(limit as i64 + 1);

    let mut data = events.list_events(&query).await?;
    let next_cursor = if data.len() > limit {
        data.truncate(limit);
        data.last().map(|e| encode_cursor(e.created_at, e.id))
    } else {
        None
    };

    Ok(VerificationPage { data, next_cursor })
}

fn status_failure(status: CardStatus) -> (FailureCode, String) {
    match status {
        CardStatus::Lost | CardStatus::Stolen => (
            FailureCode::CardReported,
            format!("Card has been reported {}", status),
        ),
        CardStatus::Expired => (
            FailureCode::CardExpired,
            FailureCode::CardExpired.default_reason().to_string(),
        ),
        other => (
            FailureCode::CardInactive,
            format!("Card is not active (status: {})", other),
        ),
    }
}

fn internal_failure(card: Option<MemberCard>) -> VerificationOutcome {
    VerificationOutcome::failure(
        FailureCode::InternalError,
        FailureCode::InternalError.default_reason(),
        card,
    )
}

fn event_for(
    request: &VerifyCardRequest,
    card: Option<&MemberCard>,
    result: VerificationResult,
    reason: Option<String>,
) -> NewVerificationEvent {
    NewVerificationEvent {
        card_id: card.map(|c| c.id),
        member_id: card.map(|c| c.member_id),
        verified_by: request.provider_id.trim().to_string(),
        verification_type: request.verification_type,
        verification_result: result,
        location: request.location.clone(),
        device_info: request.device_info.clone(),
        reason,
    }
}
