//! Verification event entities (database row mappings).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::analytics::UsageBucket;
use domain::models::verification::{CardVerificationEvent, VerificationResult, VerificationType};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for verification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "verification_type", rename_all = "snake_case")]
pub enum VerificationTypeDb {
    QrScan,
    ManualEntry,
    NfcTap,
}

impl From<VerificationType> for VerificationTypeDb {
    fn from(t: VerificationType) -> Self {
        match t {
            VerificationType::QrScan => VerificationTypeDb::QrScan,
            VerificationType::ManualEntry => VerificationTypeDb::ManualEntry,
            VerificationType::NfcTap => VerificationTypeDb::NfcTap,
        }
    }
}

impl From<VerificationTypeDb> for VerificationType {
    fn from(t: VerificationTypeDb) -> Self {
        match t {
            VerificationTypeDb::QrScan => VerificationType::QrScan,
            VerificationTypeDb::ManualEntry => VerificationType::ManualEntry,
            VerificationTypeDb::NfcTap => VerificationType::NfcTap,
        }
    }
}

/// Database enum for verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "verification_result", rename_all = "lowercase")]
pub enum VerificationResultDb {
    Success,
    Failed,
}

impl From<VerificationResult> for VerificationResultDb {
    fn from(r: VerificationResult) -> Self {
        match r {
            VerificationResult::Success => VerificationResultDb::Success,
            VerificationResult::Failed => VerificationResultDb::Failed,
        }
    }
}

impl From<VerificationResultDb> for VerificationResult {
    fn from(r: VerificationResultDb) -> Self {
        match r {
            VerificationResultDb::Success => VerificationResult::Success,
            VerificationResultDb::Failed => VerificationResult::Failed,
        }
    }
}

/// Database row mapping for the card_verification_events table.
#[derive(Debug, Clone, FromRow)]
pub struct VerificationEventEntity {
    pub id: i64,
    pub card_id: Option<Uuid>,
    pub member_id: Option<i64>,
    pub verified_by: String,
    pub verification_type: VerificationTypeDb,
    pub verification_result: VerificationResultDb,
    pub location: Option<String>,
    pub device_info: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<VerificationEventEntity> for CardVerificationEvent {
    fn from(entity: VerificationEventEntity) -> Self {
        Self {
            id: entity.id,
            card_id: entity.card_id,
            member_id: entity.member_id,
            verified_by: entity.verified_by,
            verification_type: entity.verification_type.into(),
            verification_result: entity.verification_result.into(),
            location: entity.location,
            device_info: entity.device_info,
            reason: entity.reason,
            created_at: entity.created_at,
        }
    }
}

/// Grouped count row from the usage aggregation query.
#[derive(Debug, Clone, FromRow)]
pub struct UsageBucketEntity {
    pub day: NaiveDate,
    pub verification_type: VerificationTypeDb,
    pub verification_result: VerificationResultDb,
    pub count: i64,
}

impl From<UsageBucketEntity> for UsageBucket {
    fn from(entity: UsageBucketEntity) -> Self {
        Self {
            day: entity.day,
            verification_type: entity.verification_type.into(),
            verification_result: entity.verification_result.into(),
            count: entity.count,
        }
    }
}
