//! PostgreSQL implementations of the card storage ports.

pub mod api_key;
pub mod card_template;
pub mod error;
pub mod member;
pub mod member_card;
pub mod production_batch;
pub mod verification_event;

pub use api_key::ApiKeyRepository;
pub use card_template::TemplateRepository;
pub use member::MemberRepository;
pub use member_card::CardRepository;
pub use production_batch::BatchRepository;
pub use verification_event::VerificationEventRepository;
