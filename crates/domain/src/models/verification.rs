//! Card verification domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::card::MemberCard;

/// How the card was presented at point of care.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    QrScan,
    ManualEntry,
    NfcTap,
}

impl VerificationType {
    pub const ALL: [VerificationType; 3] = [
        VerificationType::QrScan,
        VerificationType::ManualEntry,
        VerificationType::NfcTap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationType::QrScan => "qr_scan",
            VerificationType::ManualEntry => "manual_entry",
            VerificationType::NfcTap => "nfc_tap",
        }
    }
}

impl std::fmt::Display for VerificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result recorded on a verification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationResult {
    Success,
    Failed,
}

impl VerificationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationResult::Success => "success",
            VerificationResult::Failed => "failed",
        }
    }
}

/// Immutable audit record of one verification attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardVerificationEvent {
    pub id: i64,
    pub card_id: Option<Uuid>,
    pub member_id: Option<i64>,
    pub verified_by: String,
    pub verification_type: VerificationType,
    pub verification_result: VerificationResult,
    pub location: Option<String>,
    pub device_info: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a verification event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVerificationEvent {
    pub card_id: Option<Uuid>,
    pub member_id: Option<i64>,
    pub verified_by: String,
    pub verification_type: VerificationType,
    pub verification_result: VerificationResult,
    pub location: Option<String>,
    pub device_info: Option<String>,
    pub reason: Option<String>,
}

/// Machine-readable failure code telling the operator what to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    /// Token misread or unknown; retry the scan.
    CardNotFound,
    /// Lost or stolen; escalate.
    CardReported,
    CardInactive,
    CardExpired,
    /// Coverage lapsed; deny.
    MemberIneligible,
    MemberNotFound,
    InternalError,
}

impl FailureCode {
    pub fn default_reason(&self) -> &'static str {
        match self {
            FailureCode::CardNotFound => "Card not found",
            FailureCode::CardReported => "Card has been reported lost or stolen",
            FailureCode::CardInactive => "Card is not active",
            FailureCode::CardExpired => "Card has expired",
            FailureCode::MemberIneligible => "Member is not eligible",
            FailureCode::MemberNotFound => "Member not found",
            FailureCode::InternalError => "Verification could not be completed",
        }
    }
}

/// Request to verify a presented card.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCardRequest {
    #[validate(length(min = 1, max = 2048, message = "qrCodeData must be 1-2048 characters"))]
    pub qr_code_data: String,

    #[validate(length(min = 1, max = 100, message = "providerId must be 1-100 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub provider_id: String,

    pub verification_type: VerificationType,

    #[validate(length(max = 255, message = "location must be at most 255 characters"))]
    pub location: Option<String>,

    #[validate(length(max = 500, message = "deviceInfo must be at most 500 characters"))]
    pub device_info: Option<String>,
}

/// Minimal member projection returned at the point of care.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub id: i64,
    pub name: String,
    pub member_type: String,
    pub date_of_birth: NaiveDate,
}

/// Structured verification result; failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<MemberCard>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<FailureCode>,
}

impl VerificationOutcome {
    pub fn success(card: MemberCard, member: MemberSummary) -> Self {
        Self {
            valid: true,
            card: Some(card),
            member: Some(member),
            reason: None,
            failure_code: None,
        }
    }

    pub fn failure(code: FailureCode, reason: impl Into<String>, card: Option<MemberCard>) -> Self {
        Self {
            valid: false,
            card,
            member: None,
            reason: Some(reason.into()),
            failure_code: Some(code),
        }
    }
}

/// Filters for reading verification events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationEventQuery {
    pub card_id: Option<Uuid>,
    pub member_id: Option<i64>,
    pub result: Option<VerificationResult>,
    pub verification_type: Option<VerificationType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Keyset position: events strictly older than `(created_at, id)`.
    pub before: Option<(DateTime<Utc>, i64)>,
    pub limit: Option<i64>,
}

/// Query parameters for the verification listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVerificationsQuery {
    pub member_id: Option<i64>,
    pub result: Option<VerificationResult>,
    pub verification_type: Option<VerificationType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub cursor: Option<String>,
    pub limit: Option<u32>,
}

/// One page of verification events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPage {
    pub data: Vec<CardVerificationEvent>,
    pub next_cursor: Option<String>,
}
