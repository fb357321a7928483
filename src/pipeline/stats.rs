//! Run-wide counters shared by every worker.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated concurrently by the workers
#[derive(Debug)]
pub struct RunStats {
    started_at: DateTime<Utc>,
    pages_fetched: AtomicU64,
    rows_translated: AtomicU64,
    rows_skipped: AtomicU64,
    rows_blank: AtomicU64,
}

/// Point-in-time copy of [`RunStats`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub pages_fetched: u64,
    pub rows_translated: u64,
    pub rows_skipped: u64,
    pub rows_blank: u64,
    pub elapsed_ms: i64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            pages_fetched: AtomicU64::new(0),
            rows_translated: AtomicU64::new(0),
            rows_skipped: AtomicU64::new(0),
            rows_blank: AtomicU64::new(0),
        }
    }

    pub fn record_page(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translated(&self) {
        self.rows_translated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.rows_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blank(&self) {
        self.rows_blank.fetch_add(1, Ordering::Relaxed);
    }

    /// Rows that reached a final decision, whatever it was
    pub fn rows_handled(&self) -> u64 {
        self.rows_translated.load(Ordering::Relaxed)
            + self.rows_skipped.load(Ordering::Relaxed)
            + self.rows_blank.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            rows_translated: self.rows_translated.load(Ordering::Relaxed),
            rows_skipped: self.rows_skipped.load(Ordering::Relaxed),
            rows_blank: self.rows_blank.load(Ordering::Relaxed),
            elapsed_ms: (Utc::now() - self.started_at).num_milliseconds(),
        }
    }
}

impl StatsSnapshot {
    /// One-line human readable summary
    pub fn summary(&self) -> String {
        format!(
            "{} rows translated, {} skipped, {} blank across {} pages in {:.1}s",
            self.rows_translated,
            self.rows_skipped,
            self.rows_blank,
            self.pages_fetched,
            self.elapsed_ms as f64 / 1000.0
        )
    }
}
