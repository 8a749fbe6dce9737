//! Card usage analytics models.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::verification::{VerificationResult, VerificationType};
use crate::error::CardError;

/// Query parameters for usage statistics.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    pub member_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Resolved reporting window; both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    /// Fills missing bounds: the end defaults to `now`, the start to
    /// `default_days` before the end.
    pub fn resolve(
        query: &UsageQuery,
        now: DateTime<Utc>,
        default_days: u32,
    ) -> Result<Self, CardError> {
        let end = query.end_date.unwrap_or(now);
        let start = query
            .start_date
            .unwrap_or_else(|| end - Duration::days(default_days as i64));

        if start > end {
            return Err(CardError::Validation(
                "startDate must not be after endDate".to_string(),
            ));
        }

        Ok(Self { start, end })
    }
}

/// Pre-aggregated event count for one day, type and result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageBucket {
    pub day: NaiveDate,
    pub verification_type: VerificationType,
    pub verification_result: VerificationResult,
    pub count: i64,
}

/// Per-day verification counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
}

/// Usage statistics over a window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatistics {
    pub member_id: Option<i64>,
    pub window: UsageWindow,
    pub total_verifications: i64,
    pub successful_verifications: i64,
    pub failed_verifications: i64,
    /// Successful over total, 0.0 for an empty window.
    pub success_rate: f64,
    pub by_type: BTreeMap<String, i64>,
    pub by_day: Vec<DailyUsage>,
}

impl UsageStatistics {
    pub fn aggregate(member_id: Option<i64>, window: UsageWindow, buckets: &[UsageBucket]) -> Self {
        let mut by_type: BTreeMap<String, i64> = VerificationType::ALL
            .iter()
            .map(|t| (t.as_str().to_string(), 0))
            .collect();
        let mut by_day: BTreeMap<NaiveDate, DailyUsage> = BTreeMap::new();
        let mut successful = 0;
        let mut failed = 0;

        for bucket in buckets {
            *by_type
                .entry(bucket.verification_type.as_str().to_string())
                .or_insert(0) += bucket.count;

            let day = by_day.entry(bucket.day).or_insert_with(|| DailyUsage {
                date: bucket.day,
                total: 0,
                successful: 0,
                failed: 0,
            });
            day.total += bucket.count;

            match bucket.verification_result {
                VerificationResult::Success => {
                    successful += bucket.count;
                    day.successful += bucket.count;
                }
                VerificationResult::Failed => {
                    failed += bucket.count;
                    day.failed += bucket.count;
                }
            }
        }

        let total = successful + failed;
        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64
        };

        Self {
            member_id,
            window,
            total_verifications: total,
            successful_verifications: successful,
            failed_verifications: failed,
            success_rate,
            by_type,
            by_day: by_day.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn bucket(d: u32, t: VerificationType, r: VerificationResult, count: i64) -> UsageBucket {
        UsageBucket {
            day: day(d),
            verification_type: t,
            verification_result: r,
            count,
        }
    }

    fn window() -> UsageWindow {
        UsageWindow {
            start: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_empty_window_has_zero_rate() {
        let stats = UsageStatistics::aggregate(None, window(), &[]);
        assert_eq!(stats.total_verifications, 0);
        assert_eq!(stats.successful_verifications, 0);
        assert_eq!(stats.failed_verifications, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert!(!stats.success_rate.is_nan());
        assert_eq!(stats.by_type.len(), 3);
        assert!(stats.by_type.values().all(|c| *c == 0));
        assert!(stats.by_day.is_empty());
    }

    #[test]
    fn test_aggregate_counts() {
        use VerificationResult::*;
        use VerificationType::*;

        let buckets = vec![
            bucket(3, QrScan, Success, 3),
            bucket(3, QrScan, Failed, 1),
            bucket(2, ManualEntry, Success, 2),
            bucket(3, NfcTap, Failed, 2),
        ];
        let stats = UsageStatistics::aggregate(Some(42), window(), &buckets);

        assert_eq!(stats.total_verifications, 8);
        assert_eq!(stats.successful_verifications, 5);
        assert_eq!(stats.failed_verifications, 3);
        assert!((stats.success_rate - 0.625).abs() < f64::EPSILON);
        assert_eq!(stats.by_type["qr_scan"], 4);
        assert_eq!(stats.by_type["manual_entry"], 2);
        assert_eq!(stats.by_type["nfc_tap"], 2);

        assert_eq!(stats.by_day.len(), 2);
        assert_eq!(stats.by_day[0].date, day(2));
        assert_eq!(stats.by_day[1].total, 6);
        assert_eq!(stats.by_day[1].failed, 3);
    }

    #[test]
    fn test_resolve_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap();
        let window = UsageWindow::resolve(&UsageQuery::default(), now, 30).unwrap();
        assert_eq!(window.end, now);
        assert_eq!(window.start, now - Duration::days(30));
    }

    #[test]
    fn test_resolve_rejects_inverted_window() {
        let now = Utc::now();
        let query = UsageQuery {
            member_id: None,
            start_date: Some(now),
            end_date: Some(now - Duration::days(1)),
        };
        assert!(matches!(
            UsageWindow::resolve(&query, now, 30),
            Err(CardError::Validation(_))
        ));
    }
}
