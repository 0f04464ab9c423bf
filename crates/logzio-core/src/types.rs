// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for the shipper.
//!
//! The shipper treats log payloads as opaque bytes: no parsing, no
//! interpretation. [`QueueItem`] is the unit every queue stores and hands
//! back to the drain loop.

use serde::{Deserialize, Serialize};

// =============================================================================
// QueueItem
// =============================================================================

/// A single queued log record.
///
/// The payload is the caller-supplied bytes, verbatim. Durable queues assign
/// a monotonically increasing identifier that keeps increasing across process
/// restarts; the in-memory queue does not assign identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Monotonic identifier, assigned by the durable queue only.
    pub id: Option<u64>,

    /// The opaque log payload.
    pub value: Vec<u8>,
}

impl QueueItem {
    /// Creates an item without an identifier (in-memory variant).
    pub fn new(value: Vec<u8>) -> Self {
        Self { id: None, value }
    }

    /// Creates an item carrying a durable-queue identifier.
    pub fn with_id(id: u64, value: Vec<u8>) -> Self {
        Self {
            id: Some(id),
            value,
        }
    }

    /// Returns the payload size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
