// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Sender configuration and crate-wide constants.
//!
//! Every knob is injected at construction; the sender never reads
//! configuration from the environment. Defaults match the production
//! listener: 5 s drain cadence, gzip on, durable queue under a unique
//! temporary directory, 95 % disk-usage admission threshold.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Maximum batch body size, pre-compression.
pub const MAX_BATCH_SIZE: usize = 3 * 1024 * 1024;

/// Delivery attempts per batch before it is requeued.
pub const SEND_RETRIES: usize = 4;

/// Default listener endpoint.
pub const DEFAULT_LISTENER_URL: &str = "https://listener.logz.io:8071";

/// Default interval between periodic drains.
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_secs(5);

/// Default base delay of the exponential retry backoff (2 s, 4 s, 8 s).
pub const DEFAULT_SEND_BACKOFF: Duration = Duration::from_secs(2);

/// Default end-to-end timeout of a single HTTP attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default byte capacity of the in-memory queue.
pub const DEFAULT_IN_MEMORY_CAPACITY: u64 = 9 * 1024 * 1024;

/// Default item-count limit of the in-memory queue.
pub const DEFAULT_LOG_COUNT_LIMIT: u64 = 500_000;

/// Default maximum disk-used percent accepted by admission.
pub const DEFAULT_DISK_THRESHOLD: f32 = 95.0;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a [`LogzioSender`](crate::sender::LogzioSender).
///
/// All fields are fixed at construction, with two exceptions the sender
/// exposes as runtime setters: the listener URL and the disk threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderConfig {
    /// Listener base URL. The token is appended as a query parameter at
    /// construction (and again whenever the URL is changed at runtime).
    #[serde(default = "default_url")]
    pub url: String,

    /// Interval between periodic background drains.
    #[serde(default = "default_drain_interval")]
    #[serde(with = "duration_millis")]
    pub drain_interval: Duration,

    /// Whether to gzip request bodies.
    #[serde(default = "default_compress")]
    pub compress: bool,

    /// Selects the in-memory queue instead of the durable on-disk queue.
    #[serde(default)]
    pub in_memory_queue: bool,

    /// Byte capacity of the in-memory queue.
    #[serde(default = "default_in_memory_capacity")]
    pub in_memory_capacity: u64,

    /// Item-count limit of the in-memory queue.
    #[serde(default = "default_log_count_limit")]
    pub log_count_limit: u64,

    /// Directory for the durable queue. When unset, a unique directory under
    /// the system temp dir is used.
    #[serde(default)]
    pub queue_dir: Option<PathBuf>,

    /// Maximum disk-used percent (0–100) accepted by admission.
    #[serde(default = "default_disk_threshold")]
    pub disk_threshold: f32,

    /// Whether to probe disk usage before each durable enqueue.
    #[serde(default = "default_check_disk_space")]
    pub check_disk_space: bool,

    /// Base delay of the exponential retry backoff.
    #[serde(default = "default_send_backoff")]
    #[serde(with = "duration_millis")]
    pub send_backoff: Duration,

    /// End-to-end timeout of a single HTTP attempt.
    #[serde(default = "default_request_timeout")]
    #[serde(with = "duration_millis")]
    pub request_timeout: Duration,
}

fn default_url() -> String {
    DEFAULT_LISTENER_URL.to_string()
}

fn default_drain_interval() -> Duration {
    DEFAULT_DRAIN_INTERVAL
}

fn default_compress() -> bool {
    true
}

fn default_in_memory_capacity() -> u64 {
    DEFAULT_IN_MEMORY_CAPACITY
}

fn default_log_count_limit() -> u64 {
    DEFAULT_LOG_COUNT_LIMIT
}

fn default_disk_threshold() -> f32 {
    DEFAULT_DISK_THRESHOLD
}

fn default_check_disk_space() -> bool {
    true
}

fn default_send_backoff() -> Duration {
    DEFAULT_SEND_BACKOFF
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            drain_interval: default_drain_interval(),
            compress: default_compress(),
            in_memory_queue: false,
            in_memory_capacity: default_in_memory_capacity(),
            log_count_limit: default_log_count_limit(),
            queue_dir: None,
            disk_threshold: default_disk_threshold(),
            check_disk_space: default_check_disk_space(),
            send_backoff: default_send_backoff(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl SenderConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SenderConfigBuilder {
        SenderConfigBuilder::default()
    }

    /// Creates a configuration for tests: in-memory queue, no compression,
    /// millisecond timers so retry paths run fast.
    pub fn for_testing() -> Self {
        Self {
            in_memory_queue: true,
            in_memory_capacity: 40 * 1024 * 1024,
            compress: false,
            drain_interval: Duration::from_secs(600),
            send_backoff: Duration::from_millis(10),
            request_timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }

    /// Resolves the durable queue directory, deriving a unique temporary
    /// path when none was configured.
    pub fn resolve_queue_dir(&self) -> PathBuf {
        self.queue_dir.clone().unwrap_or_else(default_queue_dir)
    }
}

/// Derives the default queue directory: `<TMP>/logzio-buffer/<nanos>`.
fn default_queue_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir()
        .join("logzio-buffer")
        .join(nanos.to_string())
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`SenderConfig`].
#[derive(Debug, Default)]
pub struct SenderConfigBuilder {
    config: SenderConfig,
}

impl SenderConfigBuilder {
    /// Sets the listener base URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Sets the periodic drain interval.
    pub fn drain_interval(mut self, interval: Duration) -> Self {
        self.config.drain_interval = interval;
        self
    }

    /// Enables or disables gzip compression of request bodies.
    pub fn compress(mut self, compress: bool) -> Self {
        self.config.compress = compress;
        self
    }

    /// Selects the in-memory queue instead of the durable queue.
    pub fn in_memory_queue(mut self, in_memory: bool) -> Self {
        self.config.in_memory_queue = in_memory;
        self
    }

    /// Sets the byte capacity of the in-memory queue.
    pub fn in_memory_capacity(mut self, bytes: u64) -> Self {
        self.config.in_memory_capacity = bytes;
        self
    }

    /// Sets the item-count limit of the in-memory queue.
    pub fn log_count_limit(mut self, limit: u64) -> Self {
        self.config.log_count_limit = limit;
        self
    }

    /// Sets the durable queue directory.
    pub fn queue_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.queue_dir = Some(dir.into());
        self
    }

    /// Sets the disk-used percent threshold (clamped to 0–100).
    pub fn disk_threshold(mut self, percent: f32) -> Self {
        self.config.disk_threshold = percent.clamp(0.0, 100.0);
        self
    }

    /// Enables or disables the disk-usage probe on admission.
    pub fn check_disk_space(mut self, check: bool) -> Self {
        self.config.check_disk_space = check;
        self
    }

    /// Sets the base delay of the retry backoff.
    pub fn send_backoff(mut self, backoff: Duration) -> Self {
        self.config.send_backoff = backoff;
        self
    }

    /// Sets the per-attempt HTTP timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SenderConfig {
        self.config
    }
}

// =============================================================================
// Tests
// =============================================================================
