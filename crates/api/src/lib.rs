//! HTTP service for member card issuance, verification and tracking.

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod routes;
