//! Shared utilities and common types for the member card service.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (hashing, random token material)
//! - Cursor pagination for verification listings
//! - Common validation logic
//! - Member session token validation

pub mod crypto;
pub mod jwt;
pub mod pagination;
pub mod validation;
