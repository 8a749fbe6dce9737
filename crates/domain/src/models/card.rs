//! Member card domain model and status state machine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::CardError;
use crate::models::production_batch::CardProductionBatch;

/// Physical form of an issued card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Physical,
    Digital,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Physical => "physical",
            CardType::Digital => "digital",
        }
    }

    /// Status a freshly issued card of this type starts in.
    pub fn initial_status(&self) -> CardStatus {
        match self {
            CardType::Physical => CardStatus::Pending,
            CardType::Digital => CardStatus::Active,
        }
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card type as requested at issuance; `both` expands to one card of each type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedCardType {
    Physical,
    Digital,
    Both,
}

impl RequestedCardType {
    pub fn card_types(&self) -> Vec<CardType> {
        match self {
            RequestedCardType::Physical => vec![CardType::Physical],
            RequestedCardType::Digital => vec![CardType::Digital],
            RequestedCardType::Both => vec![CardType::Physical, CardType::Digital],
        }
    }
}

/// Lifecycle status of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    Pending,
    Active,
    Inactive,
    Expired,
    Lost,
    Stolen,
    Damaged,
}

impl CardStatus {
    pub const ALL: [CardStatus; 7] = [
        CardStatus::Pending,
        CardStatus::Active,
        CardStatus::Inactive,
        CardStatus::Expired,
        CardStatus::Lost,
        CardStatus::Stolen,
        CardStatus::Damaged,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Pending => "pending",
            CardStatus::Active => "active",
            CardStatus::Inactive => "inactive",
            CardStatus::Expired => "expired",
            CardStatus::Lost => "lost",
            CardStatus::Stolen => "stolen",
            CardStatus::Damaged => "damaged",
        }
    }

    /// Statuses that carry `deactivated_at` and `deactivation_reason`.
    pub fn is_deactivated(&self) -> bool {
        !matches!(self, CardStatus::Pending | CardStatus::Active)
    }

    /// Lost, stolen and damaged cards are terminal and need a replacement card.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            CardStatus::Lost | CardStatus::Stolen | CardStatus::Damaged
        )
    }

    /// Whether the transition table allows moving from `self` to `to`.
    pub fn can_transition_to(&self, to: CardStatus) -> bool {
        use CardStatus::*;

        if *self == to {
            return false;
        }
        match (self, to) {
            (_, Expired) => *self != Expired,
            (Pending, Active) => true,
            (Pending | Active, Lost | Stolen | Damaged) => true,
            (Active, Inactive) => true,
            (Inactive, Active) => true,
            _ => false,
        }
    }

    /// Reason recorded when the caller does not supply one.
    pub fn default_reason(&self) -> &'static str {
        match self {
            CardStatus::Inactive => "Card deactivated",
            CardStatus::Expired => "Card expired",
            CardStatus::Lost => "Card reported lost",
            CardStatus::Stolen => "Card reported stolen",
            CardStatus::Damaged => "Card reported damaged",
            CardStatus::Pending | CardStatus::Active => "",
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = CardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CardError::Validation(format!("Unknown card status: {}", s)))
    }
}

/// An issued member credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberCard {
    pub id: Uuid,
    pub member_id: i64,
    pub template_id: Uuid,
    pub card_type: CardType,
    pub card_status: CardStatus,
    /// Bearer secret behind the QR code; only the owner's card download exposes it.
    #[serde(skip_serializing)]
    pub verification_token: String,
    pub issued_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivation_reason: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub shipping_address: Option<String>,
    pub expedited_shipping: bool,
    pub tracking_number: Option<String>,
    pub needs_replacement: bool,
    pub replaces_card_id: Option<Uuid>,
    pub replaced_by_card_id: Option<Uuid>,
    pub notes: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemberCard {
    /// Whether the card has passed its expiry date, regardless of stored status.
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Plans a status change according to the transition table.
    ///
    /// This is the only place `deactivated_at`, `deactivation_reason` and
    /// `needs_replacement` are derived; stores persist the plan verbatim.
    pub fn plan_status_change(
        &self,
        to: CardStatus,
        reason: Option<&str>,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, CardError> {
        if !self.card_status.can_transition_to(to) {
            return Err(CardError::invalid_transition(self.card_status, to));
        }

        let (deactivated_at, deactivation_reason) = if to.is_deactivated() {
            let reason = reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| to.default_reason());
            (Some(now), Some(reason.to_string()))
        } else {
            (None, None)
        };

        let notes = match (self.notes.as_deref(), notes.map(str::trim)) {
            (existing, None) | (existing, Some("")) => existing.map(str::to_string),
            (Some(existing), Some(new)) => Some(format!("{}\n{}", existing, new)),
            (None, Some(new)) => Some(new.to_string()),
        };

        Ok(StatusChange {
            status: to,
            deactivated_at,
            deactivation_reason,
            needs_replacement: self.needs_replacement || to.is_reported(),
            notes,
            expected_version: self.version,
        })
    }
}

/// A planned, validated status write.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: CardStatus,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivation_reason: Option<String>,
    pub needs_replacement: bool,
    pub notes: Option<String>,
    /// The write only applies if the stored version still matches.
    pub expected_version: i32,
}

/// Input for inserting a new card.
#[derive(Debug, Clone)]
pub struct NewMemberCard {
    pub member_id: i64,
    pub template_id: Uuid,
    pub card_type: CardType,
    pub card_status: CardStatus,
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
    pub shipping_address: Option<String>,
    pub expedited_shipping: bool,
    pub replaces_card_id: Option<Uuid>,
}

/// A stored card and, for physical cards, the production batch it joined.
#[derive(Debug, Clone)]
pub struct IssuedCard {
    pub card: MemberCard,
    pub batch: Option<CardProductionBatch>,
}

/// Computes a card's expiry from its issuance time.
pub fn expiry_from(issued_at: DateTime<Utc>, validity_days: u32) -> DateTime<Utc> {
    issued_at + Duration::days(validity_days as i64)
}

/// Request to issue cards for a member.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCardsRequest {
    #[validate(custom(function = "shared::validation::validate_external_id"))]
    pub member_id: i64,

    pub card_type: RequestedCardType,

    pub template_id: Option<Uuid>,

    #[validate(custom(function = "crate::models::card::validate_optional_external_id"))]
    pub company_id: Option<i64>,

    pub expedited_shipping: Option<bool>,

    #[validate(length(min = 1, max = 500, message = "shippingAddress must be 1-500 characters"))]
    pub shipping_address: Option<String>,
}

/// Request to change a card's status.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardStatusRequest {
    pub status: CardStatus,

    #[validate(length(max = 500, message = "reason must be at most 500 characters"))]
    pub reason: Option<String>,

    #[validate(length(max = 2000, message = "notes must be at most 2000 characters"))]
    pub notes: Option<String>,

    /// Version the caller last read; a mismatch fails with a conflict.
    pub expected_version: Option<i32>,
}

/// Request to replace a card.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceCardRequest {
    #[validate(length(min = 1, max = 500, message = "reason must be 1-500 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub reason: String,

    pub expedited: Option<bool>,

    #[validate(length(min = 1, max = 500, message = "shippingAddress must be 1-500 characters"))]
    pub shipping_address: Option<String>,
}

/// Validates an optional external identifier.
pub fn validate_optional_external_id(id: i64) -> Result<(), validator::ValidationError> {
    shared::validation::validate_external_id(id)
}
