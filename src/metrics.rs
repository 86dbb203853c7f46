use std::sync::atomic::{AtomicU64, Ordering};

use crate::logging;

#[derive(Debug, Default)]
pub struct Metrics {
    api_requests: AtomicU64,
    retries: AtomicU64,
    pages_fetched: AtomicU64,
    issues_fetched: AtomicU64,
    detail_failures: AtomicU64,
    records_written: AtomicU64,
    records_skipped: AtomicU64,
    checkpoint_failures: AtomicU64,
}

/// Point-in-time copy of the run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub api_requests: u64,
    pub retries: u64,
    pub pages_fetched: u64,
    pub issues_fetched: u64,
    pub detail_failures: u64,
    pub records_written: u64,
    pub records_skipped: u64,
    pub checkpoint_failures: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_api_request(&self) {
        self.api_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_page_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_issue_fetched(&self) {
        self.issues_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_detail_failure(&self) {
        self.detail_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_record_written(&self) {
        self.records_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_record_skipped(&self) {
        self.records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_checkpoint_failure(&self) {
        self.checkpoint_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            api_requests: self.api_requests.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            issues_fetched: self.issues_fetched.load(Ordering::Relaxed),
            detail_failures: self.detail_failures.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
            checkpoint_failures: self.checkpoint_failures.load(Ordering::Relaxed),
        }
    }
}

pub fn log_summary(metrics: &Metrics) {
    let s = metrics.snapshot();
    logging::info(format!(
        "run summary api_requests={} retries={} pages={} issues_fetched={} detail_failures={} written={} skipped={} checkpoint_failures={}",
        s.api_requests,
        s.retries,
        s.pages_fetched,
        s.issues_fetched,
        s.detail_failures,
        s.records_written,
        s.records_skipped,
        s.checkpoint_failures
    ));
}
