//! Card management services.
//!
//! Services hold the business rules and talk to storage only through the
//! ports in [`store`].

pub mod analytics;
pub mod batches;
pub mod lifecycle;
#[cfg(test)]
pub mod memory;
pub mod store;
pub mod templates;
pub mod token;
pub mod verification;

use std::sync::Arc;
use std::time::Duration;

pub use analytics::UsageAnalytics;
pub use batches::BatchTracker;
pub use lifecycle::{CardLifecycle, DigitalCardDownload};
pub use store::{
    BatchStore, CardStore, CoverageEligibility, EligibilityChecker, MemberDirectory, Stores,
    TemplateStore, VerificationLog,
};
pub use templates::TemplateCatalog;
pub use verification::CardVerifier;

/// Tunables shared by the card services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSettings {
    /// Days a newly issued card stays valid.
    pub validity_days: u32,
    /// Base URL embedded in QR payloads; `None` encodes the bare token.
    pub verification_base_url: Option<String>,
    /// Minimum latency of a verification response.
    pub verification_min_response_ms: u64,
    /// Window used by usage statistics when no start date is given.
    pub analytics_window_days: u32,
}

impl Default for CardSettings {
    fn default() -> Self {
        Self {
            validity_days: 730,
            verification_base_url: None,
            verification_min_response_ms: 0,
            analytics_window_days: 30,
        }
    }
}

/// All card services wired to one set of stores.
#[derive(Clone)]
pub struct CardServices {
    pub lifecycle: CardLifecycle,
    pub verifier: CardVerifier,
    pub templates: TemplateCatalog,
    pub batches: BatchTracker,
    pub analytics: UsageAnalytics,
}

impl CardServices {
    pub fn new(stores: Stores, settings: CardSettings) -> Self {
        let settings = Arc::new(settings);
        let templates = TemplateCatalog::new(stores.templates.clone());
        let batches = BatchTracker::new(stores.batches.clone());

        let lifecycle = CardLifecycle::new(
            stores.cards.clone(),
            stores.members.clone(),
            stores.eligibility.clone(),
            templates.clone(),
            settings.clone(),
        );
        let verifier = CardVerifier::new(
            stores.cards.clone(),
            stores.members.clone(),
            stores.eligibility.clone(),
            stores.events.clone(),
            Duration::from_millis(settings.verification_min_response_ms),
        );
        let analytics = UsageAnalytics::new(stores.events.clone(), settings.analytics_window_days);

        Self {
            lifecycle,
            verifier,
            templates,
            batches,
            analytics,
        }
    }
}
