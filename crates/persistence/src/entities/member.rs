//! Member entity (database row mapping).

use chrono::NaiveDate;
use domain::models::member::{CoverageStatus, Member};
use sqlx::FromRow;

/// Database enum for coverage status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "coverage_status", rename_all = "lowercase")]
pub enum CoverageStatusDb {
    Active,
    Suspended,
    Terminated,
}

impl From<CoverageStatusDb> for CoverageStatus {
    fn from(status: CoverageStatusDb) -> Self {
        match status {
            CoverageStatusDb::Active => CoverageStatus::Active,
            CoverageStatusDb::Suspended => CoverageStatus::Suspended,
            CoverageStatusDb::Terminated => CoverageStatus::Terminated,
        }
    }
}

/// Database row mapping for the members table.
#[derive(Debug, Clone, FromRow)]
pub struct MemberEntity {
    pub id: i64,
    pub company_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub member_type: String,
    pub date_of_birth: NaiveDate,
    pub coverage_status: CoverageStatusDb,
    pub coverage_end_date: Option<NaiveDate>,
}

impl From<MemberEntity> for Member {
    fn from(entity: MemberEntity) -> Self {
        Self {
            id: entity.id,
            company_id: entity.company_id,
            first_name: entity.first_name,
            last_name: entity.last_name,
            member_type: entity.member_type,
            date_of_birth: entity.date_of_birth,
            coverage_status: entity.coverage_status.into(),
            coverage_end_date: entity.coverage_end_date,
        }
    }
}
