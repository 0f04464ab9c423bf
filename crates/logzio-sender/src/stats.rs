// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Lock-free sender statistics.
//!
//! All counters are cumulative atomics; [`SenderStats`] is an O(1)
//! snapshot. Note that `logs_dropped` here never resets — the resettable
//! dropped-log count reported to the server lives on the sender itself.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// =============================================================================
// Counters
// =============================================================================

/// Internal atomic counters.
#[derive(Debug, Default)]
pub(crate) struct StatsInner {
    logs_enqueued: AtomicU64,
    bytes_enqueued: AtomicU64,
    logs_dropped: AtomicU64,
    oversized_discarded: AtomicU64,
    drains: AtomicU64,
    batches_sent: AtomicU64,
    bytes_sent: AtomicU64,
    failed_posts: AtomicU64,
    requeues: AtomicU64,
}

impl StatsInner {
    #[inline]
    pub(crate) fn record_enqueued(&self, bytes: u64) {
        self.logs_enqueued.fetch_add(1, Ordering::Relaxed);
        self.bytes_enqueued.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.logs_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_oversized(&self, count: u64) {
        self.oversized_discarded.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_drain(&self) {
        self.drains.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_batch_sent(&self, bytes: u64) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failed_post(&self) {
        self.failed_posts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_requeue(&self) {
        self.requeues.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SenderStats {
        SenderStats {
            logs_enqueued: self.logs_enqueued.load(Ordering::Relaxed),
            bytes_enqueued: self.bytes_enqueued.load(Ordering::Relaxed),
            logs_dropped: self.logs_dropped.load(Ordering::Relaxed),
            oversized_discarded: self.oversized_discarded.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            failed_posts: self.failed_posts.load(Ordering::Relaxed),
            requeues: self.requeues.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable snapshot of sender statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderStats {
    /// Payloads accepted into the queue.
    pub logs_enqueued: u64,
    /// Payload bytes accepted into the queue.
    pub bytes_enqueued: u64,
    /// Payloads rejected by admission (cumulative, never reset).
    pub logs_dropped: u64,
    /// Payloads discarded for exceeding the batch size limit outright.
    pub oversized_discarded: u64,
    /// Drain passes executed.
    pub drains: u64,
    /// Batches accepted by the server.
    pub batches_sent: u64,
    /// Batch bytes (pre-compression) accepted by the server.
    pub bytes_sent: u64,
    /// Delivery attempts that failed or were rejected as retriable.
    pub failed_posts: u64,
    /// Batches requeued after exhausting their retries.
    pub requeues: u64,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = StatsInner::default();

        stats.record_enqueued(100);
        stats.record_enqueued(50);
        stats.record_dropped();
        stats.record_drain();
        stats.record_batch_sent(151);
        stats.record_failed_post();
        stats.record_requeue();
        stats.record_oversized(2);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.logs_enqueued, 2);
        assert_eq!(snapshot.bytes_enqueued, 150);
        assert_eq!(snapshot.logs_dropped, 1);
        assert_eq!(snapshot.oversized_discarded, 2);
        assert_eq!(snapshot.drains, 1);
        assert_eq!(snapshot.batches_sent, 1);
        assert_eq!(snapshot.bytes_sent, 151);
        assert_eq!(snapshot.failed_posts, 1);
        assert_eq!(snapshot.requeues, 1);
    }
}
