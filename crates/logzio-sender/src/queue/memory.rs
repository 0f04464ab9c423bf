// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory queue implementation.
//!
//! A `VecDeque` behind a `parking_lot` mutex, with atomic byte and item
//! counters so `len()` never touches the lock. Nothing is persisted; the
//! queue's contents are lost when the process exits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use logzio_core::{QueueError, QueueItem};

use crate::queue::LogQueue;

// =============================================================================
// Memory Queue
// =============================================================================

/// A bounded, process-local FIFO of log payloads.
///
/// The item-count cap (`max_items`) is enforced by the admission controller,
/// not by `enqueue` — an admitted payload is always stored. `len()` reports
/// the summed payload byte size, the unit the byte-capacity admission policy
/// works in.
#[derive(Debug)]
pub struct MemoryQueue {
    /// The payload queue (FIFO).
    entries: Mutex<VecDeque<Vec<u8>>>,

    /// O(1) summed payload bytes.
    byte_len: AtomicU64,

    /// O(1) item count.
    item_count: AtomicU64,

    /// Item-count cap consulted by admission.
    max_items: u64,

    /// Set once by `close`.
    closed: AtomicBool,
}

impl MemoryQueue {
    /// Creates a new in-memory queue with the given item-count cap.
    pub fn new(max_items: u64) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            byte_len: AtomicU64::new(0),
            item_count: AtomicU64::new(0),
            max_items,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the current item count.
    #[inline]
    pub fn item_count(&self) -> u64 {
        self.item_count.load(Ordering::Relaxed)
    }

    /// Returns `true` once the item-count cap is reached.
    #[inline]
    pub fn at_capacity(&self) -> bool {
        self.item_count() >= self.max_items
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.closed.load(Ordering::Acquire) {
            Err(QueueError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LogQueue for MemoryQueue {
    async fn enqueue(&self, payload: &[u8]) -> Result<QueueItem, QueueError> {
        self.ensure_open()?;

        let value = payload.to_vec();
        self.entries.lock().push_back(value.clone());

        self.byte_len.fetch_add(value.len() as u64, Ordering::Relaxed);
        self.item_count.fetch_add(1, Ordering::Relaxed);

        Ok(QueueItem::new(value))
    }

    async fn dequeue(&self) -> Result<Option<QueueItem>, QueueError> {
        self.ensure_open()?;

        let value = self.entries.lock().pop_front();
        match value {
            Some(value) => {
                self.byte_len.fetch_sub(value.len() as u64, Ordering::Relaxed);
                self.item_count.fetch_sub(1, Ordering::Relaxed);
                Ok(Some(QueueItem::new(value)))
            }
            None => Ok(None),
        }
    }

    /// Returns the summed payload byte size currently stored.
    #[inline]
    fn len(&self) -> u64 {
        self.byte_len.load(Ordering::Relaxed)
    }

    async fn close(&self) -> Result<(), QueueError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.entries.lock().clear();
            self.byte_len.store(0, Ordering::Relaxed);
            self.item_count.store(0, Ordering::Relaxed);
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
