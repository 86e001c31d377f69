//! Lifetime counters and point-in-time snapshots of the admission queue.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub(crate) struct QueueStats {
    admitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    upstream_failures: AtomicU64,
}

impl QueueStats {
    pub(crate) fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_upstream_failure(&self) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// Queue state as seen by the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueSnapshot {
    pub pending: usize,
    pub in_flight: usize,
    pub max_concurrency: usize,
    pub max_queue_size: usize,
    pub admitted_total: u64,
    pub rejected_total: u64,
    /// Jobs that reached the upstream and finished, failures included.
    pub completed_total: u64,
    pub upstream_failures_total: u64,
}

impl QueueSnapshot {
    pub(crate) fn new(pending: usize, in_flight: usize, max_concurrency: usize, max_queue_size: usize, stats: &QueueStats) -> Self {
        Self {
            pending,
            in_flight,
            max_concurrency,
            max_queue_size,
            admitted_total: stats.admitted.load(Ordering::Relaxed),
            rejected_total: stats.rejected.load(Ordering::Relaxed),
            completed_total: stats.completed.load(Ordering::Relaxed),
            upstream_failures_total: stats.upstream_failures.load(Ordering::Relaxed),
        }
    }
}
