//! Domain layer for member card management.
//!
//! Models, the card status state machine, the verification token codec and
//! the services that issue, verify and track member cards.

pub mod error;
pub mod models;
pub mod services;

pub use error::{CardError, StoreError};
pub use services::{CardServices, CardSettings};
