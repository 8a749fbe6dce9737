//! HTTP route handlers.

pub mod analytics;
pub mod batches;
pub mod cards;
pub mod health;
pub mod templates;
pub mod verification;
