//! Member card entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::card::{CardStatus, CardType, MemberCard};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for card type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "card_type", rename_all = "lowercase")]
pub enum CardTypeDb {
    Physical,
    Digital,
}

impl From<CardType> for CardTypeDb {
    fn from(card_type: CardType) -> Self {
        match card_type {
            CardType::Physical => CardTypeDb::Physical,
            CardType::Digital => CardTypeDb::Digital,
        }
    }
}

impl From<CardTypeDb> for CardType {
    fn from(card_type: CardTypeDb) -> Self {
        match card_type {
            CardTypeDb::Physical => CardType::Physical,
            CardTypeDb::Digital => CardType::Digital,
        }
    }
}

/// Database enum for card status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "card_status", rename_all = "lowercase")]
pub enum CardStatusDb {
    Pending,
    Active,
    Inactive,
    Expired,
    Lost,
    Stolen,
    Damaged,
}

impl From<CardStatus> for CardStatusDb {
    fn from(status: CardStatus) -> Self {
        match status {
            CardStatus::Pending => CardStatusDb::Pending,
            CardStatus::Active => CardStatusDb::Active,
            CardStatus::Inactive => CardStatusDb::Inactive,
            CardStatus::Expired => CardStatusDb::Expired,
            CardStatus::Lost => CardStatusDb::Lost,
            CardStatus::Stolen => CardStatusDb::Stolen,
            CardStatus::Damaged => CardStatusDb::Damaged,
        }
    }
}

impl From<CardStatusDb> for CardStatus {
    fn from(status: CardStatusDb) -> Self {
        match status {
            CardStatusDb::Pending => CardStatus::Pending,
            CardStatusDb::Active => CardStatus::Active,
            CardStatusDb::Inactive => CardStatus::Inactive,
            CardStatusDb::Expired => CardStatus::Expired,
            CardStatusDb::Lost => CardStatus::Lost,
            CardStatusDb::Stolen => CardStatus::Stolen,
            CardStatusDb::Damaged => CardStatus::Damaged,
        }
    }
}

/// Column list shared by every query returning a full card row.
pub const MEMBER_CARD_COLUMNS: &str = "id, member_id, template_id, card_type, card_status, \
     verification_token, issued_at, last_used_at, deactivated_at, deactivation_reason, \
     expires_at, shipping_address, expedited_shipping, tracking_number, needs_replacement, \
     replaces_card_id, replaced_by_card_id, notes, version, created_at, updated_at";

/// Database row mapping for the member_cards table.
#[derive(Debug, Clone, FromRow)]
pub struct MemberCardEntity {
    pub id: Uuid,
    pub member_id: i64,
    pub template_id: Uuid,
    pub card_type: CardTypeDb,
    pub card_status: CardStatusDb,
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

impl From<MemberCardEntity> for MemberCard {
    fn from(entity: MemberCardEntity) -> Self {
        Self {
            id: entity.id,
            member_id: entity.member_id,
            template_id: entity.template_id,
            card_type: entity.card_type.into(),
            card_status: entity.card_status.into(),
            verification_token: entity.verification_token,
            issued_at: entity.issued_at,
            last_used_at: entity.last_used_at,
            deactivated_at: entity.deactivated_at,
            deactivation_reason: entity.deactivation_reason,
            expires_at: entity.expires_at,
            shipping_address: entity.shipping_address,
            expedited_shipping: entity.expedited_shipping,
            tracking_number: entity.tracking_number,
            needs_replacement: entity.needs_replacement,
            replaces_card_id: entity.replaces_card_id,
            replaced_by_card_id: entity.replaced_by_card_id,
            notes: entity.notes,
            version: entity.version,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
