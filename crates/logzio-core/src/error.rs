// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error hierarchy for the shipper workspace.
//!
//! The only error surface a caller ever sees is [`QueueError`]: admission
//! drops are silent, and delivery failures are absorbed by the drain loop.
//! Errors distinguish storage failures (the caller's problem) from use of a
//! closed queue and from corrupted on-disk records.

use thiserror::Error;

// =============================================================================
// QueueError
// =============================================================================

/// Errors produced by a queue implementation.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The underlying storage engine failed.
    #[error("Storage operation failed: {message}")]
    Storage {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The queue has been closed; no further operations are valid.
    #[error("Queue is closed")]
    Closed,

    /// A persisted record could not be read back.
    #[error("Corrupted record: {message}")]
    Corrupted {
        /// Error message.
        message: String,
    },
}

impl QueueError {
    /// Creates a storage error without an underlying source.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a storage error wrapping an underlying source error.
    pub fn storage_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a corrupted-record error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Returns the error type as a string for logging and metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            QueueError::Storage { .. } => "storage",
            QueueError::Closed => "closed",
            QueueError::Corrupted { .. } => "corrupted",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = QueueError::storage("write failed");
        assert_eq!(err.to_string(), "Storage operation failed: write failed");
        assert_eq!(err.error_type(), "storage");
    }

    #[test]
    fn test_storage_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = QueueError::storage_with("write failed", io);

        let source = std::error::Error::source(&err).expect("source should be set");
        assert_eq!(source.to_string(), "disk gone");
    }

    #[test]
    fn test_closed_error() {
        let err = QueueError::Closed;
        assert_eq!(err.to_string(), "Queue is closed");
        assert_eq!(err.error_type(), "closed");
    }

    #[test]
    fn test_corrupted_error() {
        let err = QueueError::corrupted("bad key length");
        assert_eq!(err.to_string(), "Corrupted record: bad key length");
        assert_eq!(err.error_type(), "corrupted");
    }
}
