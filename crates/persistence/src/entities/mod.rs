//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod api_key;
pub mod card_template;
pub mod member;
pub mod member_card;
pub mod production_batch;
pub mod verification_event;

pub use api_key::ApiKeyEntity;
pub use card_template::CardTemplateEntity;
pub use member::MemberEntity;
pub use member_card::MemberCardEntity;
pub use production_batch::ProductionBatchEntity;
pub use verification_event::{UsageBucketEntity, VerificationEventEntity};
