//! Database metrics for the card stores.
//!
//! `card_store_query_duration_seconds{query,outcome}` covers the hot read
//! paths (token lookup, event listing, usage buckets). Pool gauges are set
//! when `/metrics` is scraped.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Sets `card_store_pool_connections{state}` for `active` and `idle`.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("card_store_pool_connections", "state" => "active")
        .set(size.saturating_sub(idle) as f64);
    gauge!("card_store_pool_connections", "state" => "idle").set(idle as f64);
}

/// Times one query from construction until [`QueryTimer::finish`].
#[must_use = "a timer records nothing until finished"]
pub struct QueryTimer {
    query: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn start(query: &'static str) -> Self {
        Self {
            query,
            start: Instant::now(),
        }
    }

    /// Records the elapsed time labelled with the query outcome and hands the
    /// result back unchanged.
    pub fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E> {
        histogram!(
            "card_store_query_duration_seconds",
            "query" => self.query,
            "outcome" => outcome_label(&result)
        )
        .record(self.start.elapsed().as_secs_f64());
        result
    }
}

fn outcome_label<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "ok"
    } else {
        "error"
    }
}
