//! Persistence layer for the member card service.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain storage ports

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;

use std::sync::Arc;

use domain::services::store::{CoverageEligibility, Stores};
use sqlx::PgPool;

use repositories::{
    BatchRepository, CardRepository, MemberRepository, TemplateRepository,
    VerificationEventRepository,
};

/// Wires every storage port to PostgreSQL.
pub fn pg_stores(pool: PgPool) -> Stores {
    Stores {
        cards: Arc::new(CardRepository::new(pool.clone())),
        templates: Arc::new(TemplateRepository::new(pool.clone())),
        batches: Arc::new(BatchRepository::new(pool.clone())),
        events: Arc::new(VerificationEventRepository::new(pool.clone())),
        members: Arc::new(MemberRepository::new(pool)),
        eligibility: Arc::new(CoverageEligibility),
    }
}
