//! Member projection consumed from the external member store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::verification::MemberSummary;

/// Coverage state as recorded by the eligibility engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageStatus {
    Active,
    Suspended,
    Terminated,
}

/// Result of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Ineligible(String),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// The subset of a member record this service reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub company_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub member_type: String,
    pub date_of_birth: NaiveDate,
    pub coverage_status: CoverageStatus,
    pub coverage_end_date: Option<NaiveDate>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Coverage rules applied on `date`.
    pub fn eligibility_on(&self, date: NaiveDate) -> Eligibility {
        match self.coverage_status {
            CoverageStatus::Suspended => {
                Eligibility::Ineligible("Coverage is suspended".to_string())
            }
            CoverageStatus::Terminated => {
                Eligibility::Ineligible("Coverage has been terminated".to_string())
            }
            CoverageStatus::Active => match self.coverage_end_date {
                Some(end) if end < date => {
                    Eligibility::Ineligible(format!("Coverage lapsed on {}", end))
                }
                _ => Eligibility::Eligible,
            },
        }
    }

    /// Minimal projection shown at the point of care.
    pub fn summary(&self) -> MemberSummary {
        MemberSummary {
            id: self.id,
            name: self.full_name(),
            member_type: self.member_type.clone(),
            date_of_birth: self.date_of_birth,
        }
    }
}
