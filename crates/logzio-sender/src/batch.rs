// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batch assembly.
//!
//! A batch is a newline-joined concatenation of payloads, capped at
//! [`MAX_BATCH_SIZE`] bytes pre-compression. Each payload contributes
//! `len + 1` bytes; a payload is never split across batches.
//!
//! The dequeue loop keeps a *carry slot*: a payload pulled off the queue
//! that no longer fits the current batch is held and emitted first in the
//! next batch instead of being lost. Only payloads that cannot fit an empty
//! batch are discarded — they can never be shipped.

use tracing::{debug, warn};

use crate::config::MAX_BATCH_SIZE;
use crate::queue::LogQueue;

// =============================================================================
// Batch Buffer
// =============================================================================

/// Reusable batch buffer, preallocated to the batch cap.
#[derive(Debug)]
pub(crate) struct BatchBuffer {
    buf: Vec<u8>,
}

impl BatchBuffer {
    pub(crate) fn new() -> Self {
        Self {
            buf: Vec::with_capacity(MAX_BATCH_SIZE),
        }
    }

    /// Clears the buffer, keeping its allocation.
    pub(crate) fn reset(&mut self) {
        self.buf.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Whether a payload of `value_len` bytes (plus its newline) still fits.
    pub(crate) fn fits(&self, value_len: usize) -> bool {
        value_len + 1 + self.buf.len() <= MAX_BATCH_SIZE
    }

    /// Appends a payload followed by the newline delimiter.
    pub(crate) fn append(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
        self.buf.push(b'\n');
    }
}

// =============================================================================
// Fill Loop
// =============================================================================

/// Result of one batch-fill pass.
#[derive(Debug, Default)]
pub(crate) struct FillOutcome {
    /// Bytes accumulated in the buffer.
    pub(crate) bytes: usize,
    /// Payloads discarded because they exceed the batch cap outright.
    pub(crate) discarded: u64,
}

/// Fills `buf` from the carry slot and then the queue, up to the batch cap.
///
/// Stops on an empty queue, on a full batch (parking the overflow payload in
/// `carry`), or on a dequeue error (logged and absorbed; the drain retries
/// on its next pass).
pub(crate) async fn fill_batch<Q>(
    queue: &Q,
    buf: &mut BatchBuffer,
    carry: &mut Option<Vec<u8>>,
) -> FillOutcome
where
    Q: LogQueue + ?Sized,
{
    let mut discarded = 0u64;

    loop {
        let value = match carry.take() {
            Some(value) => value,
            None => match queue.dequeue().await {
                Ok(Some(item)) => item.value,
                Ok(None) => break,
                Err(e) => {
                    debug!(error = %e, "stopping batch fill on queue error");
                    break;
                }
            },
        };

        if buf.fits(value.len()) {
            buf.append(&value);
        } else if buf.is_empty() {
            // Larger than the cap on its own; it can never be shipped.
            warn!(
                size = value.len(),
                limit = MAX_BATCH_SIZE,
                "discarding payload larger than the batch limit"
            );
            discarded += 1;
        } else {
            *carry = Some(value);
            break;
        }
    }

    FillOutcome {
        bytes: buf.len(),
        discarded,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryQueue;

    #[tokio::test]
    async fn test_newline_joined_batch() {
        let queue = MemoryQueue::new(100);
        queue.enqueue(b"one").await.unwrap();
        queue.enqueue(b"two").await.unwrap();

        let mut buf = BatchBuffer::new();
        let mut carry = None;
        let outcome = fill_batch(&queue, &mut buf, &mut carry).await;

        assert_eq!(buf.as_bytes(), b"one\ntwo\n");
        assert_eq!(outcome.bytes, 8);
        assert_eq!(outcome.discarded, 0);
        assert!(carry.is_none());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_batch_respects_size_cap() {
        let queue = MemoryQueue::new(1000);
        for _ in 0..100 {
            queue.enqueue(&vec![b'x'; 33_000]).await.unwrap();
        }

        let mut buf = BatchBuffer::new();
        let mut carry = None;
        let outcome = fill_batch(&queue, &mut buf, &mut carry).await;

        assert!(outcome.bytes <= MAX_BATCH_SIZE);
        // 95 payloads of 33,001 bytes fit under 3 MiB; the 96th is carried.
        assert_eq!(outcome.bytes, 95 * 33_001);
        assert!(carry.is_some());
        assert!(!queue.is_empty());
    }

    #[tokio::test]
    async fn test_carry_opens_the_next_batch() {
        let queue = MemoryQueue::new(10);
        let big = vec![b'a'; MAX_BATCH_SIZE - 10];
        queue.enqueue(&big).await.unwrap();
        queue.enqueue(b"next-batch").await.unwrap();

        let mut buf = BatchBuffer::new();
        let mut carry = None;

        // First pass takes the big payload; "next-batch" (10+1 bytes) no
        // longer fits and is parked in the carry slot.
        fill_batch(&queue, &mut buf, &mut carry).await;
        assert_eq!(buf.len(), MAX_BATCH_SIZE - 9);
        assert_eq!(carry.as_deref(), Some(b"next-batch".as_slice()));

        // Second pass starts from the carry slot.
        buf.reset();
        let outcome = fill_batch(&queue, &mut buf, &mut carry).await;
        assert_eq!(buf.as_bytes(), b"next-batch\n");
        assert_eq!(outcome.bytes, 11);
        assert!(carry.is_none());
    }

    #[tokio::test]
    async fn test_oversized_payload_is_discarded() {
        let queue = MemoryQueue::new(10);
        queue.enqueue(&vec![b'x'; MAX_BATCH_SIZE]).await.unwrap();
        queue.enqueue(b"small").await.unwrap();

        let mut buf = BatchBuffer::new();
        let mut carry = None;
        let outcome = fill_batch(&queue, &mut buf, &mut carry).await;

        assert_eq!(outcome.discarded, 1);
        assert_eq!(buf.as_bytes(), b"small\n");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_empty_queue_yields_empty_batch() {
        let queue = MemoryQueue::new(10);
        let mut buf = BatchBuffer::new();
        let mut carry = None;

        let outcome = fill_batch(&queue, &mut buf, &mut carry).await;

        assert_eq!(outcome.bytes, 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_buffer_reuse_keeps_capacity() {
        let mut buf = BatchBuffer::new();
        buf.append(b"payload");
        assert_eq!(buf.len(), 8);

        buf.reset();
        assert!(buf.is_empty());
        assert!(buf.fits(MAX_BATCH_SIZE - 1));
        assert!(!buf.fits(MAX_BATCH_SIZE));
    }
}
