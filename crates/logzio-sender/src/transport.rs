// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HTTP delivery of assembled batches.
//!
//! A batch is POSTed as `text/plain`, optionally gzip-compressed, with the
//! shipper header carrying the attempt number and the dropped-log report:
//!
//! ```text
//! logzio-shipper: logzio-go/v1.0.0/<attempt>/<lost>
//! ```
//!
//! where `<lost>` is `0` when nothing was dropped and `1/NN:<count>`
//! otherwise. The transport reports an outcome, never an error: any failure
//! below the HTTP layer (DNS, connect, TLS, timeout) collapses into
//! [`PostStatus::TransportFailed`], which the retry classifier treats like a
//! 5xx.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::{Mutex, RwLock};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use tracing::{debug, error};

use crate::config::DEFAULT_REQUEST_TIMEOUT;

/// Name of the shipper diagnostic header.
pub const SHIPPER_HEADER: &str = "logzio-shipper";

// =============================================================================
// Post Status
// =============================================================================

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    /// The server answered with this HTTP status code.
    Http(u16),

    /// The request never produced a response (DNS, connect, TLS, timeout).
    TransportFailed,
}

impl PostStatus {
    /// Whether the attempt should be retried.
    ///
    /// Success and the 4xx codes that signal a client-side problem (bad
    /// token, bad URL, malformed request) are final. Everything else,
    /// including 5xx, unknown statuses and transport failures, is
    /// considered transient.
    pub fn should_retry(self) -> bool {
        !matches!(self, PostStatus::Http(200 | 400 | 401 | 403 | 404))
    }

    /// Whether the batch was accepted (HTTP 200).
    pub fn is_success(self) -> bool {
        matches!(self, PostStatus::Http(200))
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostStatus::Http(code) => write!(f, "HTTP {}", code),
            PostStatus::TransportFailed => write!(f, "transport failure"),
        }
    }
}

/// Formats the shipper header value for one attempt.
pub(crate) fn shipper_header(attempt: usize, dropped: u64) -> String {
    if dropped > 0 {
        format!("logzio-go/v1.0.0/{}/1/NN:{}", attempt, dropped)
    } else {
        format!("logzio-go/v1.0.0/{}/0", attempt)
    }
}

// =============================================================================
// Batch Transport Trait
// =============================================================================

/// Delivery seam between the drain controller and the wire.
///
/// The production implementation is [`HttpTransport`]; [`MockTransport`]
/// scripts outcomes for tests.
#[async_trait]
pub trait BatchTransport: Send + Sync + fmt::Debug {
    /// Posts one batch body. `attempt` is zero-based within a retry cycle;
    /// `dropped` is the dropped-log count read at request-building time.
    async fn post(&self, url: &str, body: &[u8], attempt: usize, dropped: u64) -> PostStatus;

    /// Closes any idle pooled connections. Default: no-op.
    fn close_idle_connections(&self) {}
}

// =============================================================================
// HTTP Transport
// =============================================================================

/// The reqwest-backed transport.
///
/// The client honors proxy settings from the environment and uses default
/// TLS configuration; every attempt is bounded by an end-to-end timeout.
#[derive(Debug)]
pub struct HttpTransport {
    client: RwLock<reqwest::Client>,
    compress: bool,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport with the default 10 s attempt timeout.
    pub fn new(compress: bool) -> Self {
        Self::with_timeout(compress, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a transport with a custom attempt timeout.
    pub fn with_timeout(compress: bool, timeout: Duration) -> Self {
        Self {
            client: RwLock::new(Self::build_client(timeout)),
            compress,
            timeout,
        }
    }

    fn build_client(timeout: Duration) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client")
    }

    fn gzip(body: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 2), Compression::default());
        encoder.write_all(body)?;
        encoder.finish()
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    async fn post(&self, url: &str, body: &[u8], attempt: usize, dropped: u64) -> PostStatus {
        let client = self.client.read().clone();
        let mut request = client
            .post(url)
            .header(CONTENT_TYPE, "text/plain")
            .header(SHIPPER_HEADER, shipper_header(attempt, dropped));

        let payload = if self.compress {
            match Self::gzip(body) {
                Ok(compressed) => {
                    request = request.header(CONTENT_ENCODING, "gzip");
                    compressed
                }
                Err(e) => {
                    error!(error = %e, "failed to gzip batch");
                    return PostStatus::TransportFailed;
                }
            }
        } else {
            body.to_vec()
        };

        match request.body(payload).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                // Drain and discard the response body.
                if let Err(e) = response.bytes().await {
                    debug!(error = %e, "failed reading response body");
                }
                PostStatus::Http(status)
            }
            Err(e) => {
                debug!(url, error = %e, "failed to post batch");
                PostStatus::TransportFailed
            }
        }
    }

    /// reqwest exposes no direct idle-close; swapping in a fresh client
    /// drops the old connection pool.
    fn close_idle_connections(&self) {
        *self.client.write() = Self::build_client(self.timeout);
    }
}

// =============================================================================
// Mock Transport (for testing)
// =============================================================================

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedPost {
    /// Target URL.
    pub url: String,
    /// Raw (uncompressed) batch body.
    pub body: Vec<u8>,
    /// Zero-based attempt number.
    pub attempt: usize,
    /// Dropped-log count carried by the request.
    pub dropped: u64,
}

/// A scripted transport for drain tests.
///
/// Outcomes are popped from the script in order; once the script is
/// exhausted the fallback outcome is returned.
#[derive(Debug)]
pub struct MockTransport {
    script: Mutex<Vec<PostStatus>>,
    fallback: PostStatus,
    requests: Mutex<Vec<RecordedPost>>,
}

impl MockTransport {
    /// A transport that accepts everything with HTTP 200.
    pub fn new() -> Self {
        Self::with_fallback(PostStatus::Http(200))
    }

    /// A transport that fails every attempt at the transport level.
    pub fn failing() -> Self {
        Self::with_fallback(PostStatus::TransportFailed)
    }

    /// A transport that plays `script` in order, then falls back to 200.
    pub fn with_script(script: impl IntoIterator<Item = PostStatus>) -> Self {
        let mut transport = Self::new();
        *transport.script.get_mut() = script.into_iter().collect();
        transport
    }

    fn with_fallback(fallback: PostStatus) -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            fallback,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns every request observed so far.
    pub fn requests(&self) -> Vec<RecordedPost> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests observed so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchTransport for MockTransport {
    async fn post(&self, url: &str, body: &[u8], attempt: usize, dropped: u64) -> PostStatus {
        self.requests.lock().push(RecordedPost {
            url: url.to_string(),
            body: body.to_vec(),
            attempt,
            dropped,
        });

        let mut script = self.script.lock();
        if script.is_empty() {
            self.fallback
        } else {
            script.remove(0)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
