// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # logzio-sender
//!
//! A buffered, batching log shipper. Application code hands the sender
//! discrete log records (opaque byte payloads); the sender queues them,
//! batches them up to 3 MiB, optionally gzips them, and POSTs them to a
//! remote log-ingest endpoint — absorbing transient network failure and
//! backpressure without ever blocking callers on delivery.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          LogzioSender                             │
//! │                                                                   │
//! │  send/write ──▶ Admission ──▶ LogQueue (Memory | Disk/RocksDB)    │
//! │                    │                  │                           │
//! │                    ▼                  ▼                           │
//! │              dropped_logs      ┌─────────────┐     ┌───────────┐  │
//! │              (header report)   │ Drain Loop  │────▶│ Transport │  │
//! │                                │ (periodic)  │     │ (reqwest) │  │
//! │                                └──────┬──────┘     └───────────┘  │
//! │                                       │                           │
//! │                          requeue ◀── exhausted retries            │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery contract
//!
//! - `send` never blocks on the network; it returns after the payload is
//!   admitted and stored (fsync-durable for the disk queue).
//! - Batches are retried up to 4 times with 2 s / 4 s / 8 s backoff, then
//!   requeued as a single combined item. Client-side rejections
//!   (400/401/403/404) are final and drop the batch.
//! - Admission rejections are silent to the caller; the count is carried to
//!   the server in the `logzio-shipper` header of the next successful
//!   request and reset by an HTTP 200.
//! - Ordering across retries is not guaranteed; delivery is at-least-zero,
//!   at-most-duplicated — never exactly-once.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use logzio_sender::{LogzioSender, SenderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SenderConfig::builder()
//!         .url("https://listener.logz.io:8071")
//!         .compress(true)
//!         .build();
//!
//!     let sender = LogzioSender::new("<token>", config).await?;
//!
//!     sender.send(b"{\"message\":\"hello\"}").await?;
//!
//!     // Flush on shutdown; closes the queue.
//!     sender.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module overview
//!
//! - [`sender`]: the facade, admission control and the drain controller
//! - [`queue`]: the FIFO abstraction and its two implementations
//! - [`transport`]: HTTP delivery and the retry classification
//! - [`config`]: construction-time configuration and constants
//! - [`stats`]: cumulative counters and snapshots

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod batch;
pub mod config;
pub mod queue;
pub mod sender;
pub mod stats;
pub mod transport;

pub use config::{SenderConfig, SenderConfigBuilder, DEFAULT_LISTENER_URL, MAX_BATCH_SIZE};
pub use queue::{DiskQueue, LogQueue, MemoryQueue};
pub use sender::LogzioSender;
pub use stats::SenderStats;
pub use transport::{BatchTransport, HttpTransport, MockTransport, PostStatus};

pub use logzio_core::{QueueError, QueueItem};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A prelude module that re-exports commonly used types.
pub mod prelude {
    pub use crate::config::SenderConfig;
    pub use crate::queue::{DiskQueue, LogQueue, MemoryQueue};
    pub use crate::sender::LogzioSender;
    pub use crate::transport::{BatchTransport, PostStatus};
    pub use logzio_core::{QueueError, QueueItem};
}
