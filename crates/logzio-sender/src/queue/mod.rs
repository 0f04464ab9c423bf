// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! FIFO queue abstraction over opaque log payloads.
//!
//! Two implementations exist:
//!
//! - [`MemoryQueue`]: process-local, capacity-bounded, lost on exit
//! - [`DiskQueue`]: persistent, survives restarts, bounded only by disk
//!
//! # `len()` semantics
//!
//! The two variants deliberately disagree about what `len()` measures:
//! [`MemoryQueue`] reports the **sum of payload bytes** (the admission
//! controller uses it as a byte-capacity proxy), while [`DiskQueue`] reports
//! the **item count**. The discrepancy is benign because nothing consumes
//! `len()` polymorphically: capacity math and the drain loop's emptiness
//! check both branch on the concrete variant (a byte-sum length reads zero
//! for queued zero-length payloads, so emptiness comes from item counts).

use std::fmt::Debug;

use async_trait::async_trait;

use logzio_core::{QueueError, QueueItem};

pub mod disk;
pub mod memory;

pub use disk::DiskQueue;
pub use memory::MemoryQueue;

// =============================================================================
// LogQueue Trait
// =============================================================================

/// An ordered queue of opaque byte payloads.
///
/// Implementations must be safe under concurrent `enqueue`/`dequeue`;
/// `len()` and `is_empty()` must be O(1) atomic reads.
#[async_trait]
pub trait LogQueue: Send + Sync + Debug {
    /// Appends a payload to the tail.
    ///
    /// Fails only on storage error (durable variant) or after
    /// [`close`](LogQueue::close); the in-memory variant never fails on
    /// capacity because admission rejects before it is reached.
    async fn enqueue(&self, payload: &[u8]) -> Result<QueueItem, QueueError>;

    /// Removes and returns the head item, or `None` when the queue is empty.
    async fn dequeue(&self) -> Result<Option<QueueItem>, QueueError>;

    /// Returns the queue length — summed payload bytes for the in-memory
    /// variant, item count for the durable variant (see module docs).
    fn len(&self) -> u64;

    /// Returns `true` if the queue holds no items.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Releases the queue's resources. Idempotent; operations after `close`
    /// return [`QueueError::Closed`].
    async fn close(&self) -> Result<(), QueueError>;
}
