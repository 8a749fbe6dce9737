//! Read-only verification analytics.

use std::sync::Arc;

use chrono::Utc;

use super::store::VerificationLog;
use super::verification::fetch_page;
use crate::error::CardError;
use crate::models::analytics::{UsageQuery, UsageStatistics, UsageWindow};
use crate::models::verification::{ListVerificationsQuery, VerificationEventQuery, VerificationPage};

#[derive(Clone)]
pub struct UsageAnalytics {
    events: Arc<dyn VerificationLog>,
    default_window_days: u32,
}

impl UsageAnalytics {
    pub fn new(events: Arc<dyn VerificationLog>, default_window_days: u32) -> Self {
        Self {
            events,
            default_window_days,
        }
    }

    pub async fn usage_statistics(&self, query: UsageQuery) -> Result<UsageStatistics, CardError> {
        let window = UsageWindow::resolve(&query, Utc::now(), self.default_window_days)?;
        let buckets = self.events.usage_buckets(query.member_id, window).await?;

        tracing::debug!(
            member_id = ?query.member_id,
            start = %window.start,
            end = %window.end,
            buckets = %buckets.len(),
            "Computed usage statistics"
        );

        Ok(UsageStatistics::aggregate(query.member_id, window, &buckets))
    }

    pub async fn list_verifications(
        &self,
        query: ListVerificationsQuery,
    ) -> Result<VerificationPage, CardError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(CardError::Validation(
                    "from must not be after to".to_string(),
                ));
            }
        }

        let filter = VerificationEventQuery {
            member_id: query.member_id,
            result: query.result,
            verification_type: query.verification_type,
            from: query.from,
            to: query.to,
            ..Default::default()
        };
        fetch_page(self.events.as_ref(), filter, query.cursor.as_deref(), query.limit).await
    }
}
