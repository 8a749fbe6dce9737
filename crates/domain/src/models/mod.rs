//! Domain models for member card management.

pub mod analytics;
pub mod card;
pub mod card_template;
pub mod member;
pub mod production_batch;
pub mod verification;

pub use analytics::{UsageStatistics, UsageWindow};
pub use card::{CardStatus, CardType, MemberCard};
pub use card_template::CardTemplate;
pub use member::Member;
pub use production_batch::{BatchStatus, CardProductionBatch};
pub use verification::{CardVerificationEvent, VerificationOutcome};
