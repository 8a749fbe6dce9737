//! Custom Axum extractors.

pub mod api_key;
pub mod input;
pub mod member_auth;

pub use api_key::{ApiKeyAuth, API_KEY_HEADER};
pub use input::{extract_json, extract_path, extract_query, extract_validated_json};
pub use member_auth::MemberAuth;
