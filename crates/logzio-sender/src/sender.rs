// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The sender facade and drain controller.
//!
//! [`LogzioSender`] accepts payloads through [`send`](LogzioSender::send) /
//! [`write`](LogzioSender::write), runs admission control in front of the
//! active queue, and ships queued payloads from a background drain loop:
//!
//! ```text
//! send ──▶ admission ──▶ queue (memory | disk)
//!                          │
//!          periodic task ──▶ drain ──▶ batcher ──▶ transport ──▶ listener
//!                          ▲               │
//!                          └── requeue ◀── exhausted retries
//! ```
//!
//! Contract: enqueue never blocks on delivery; an accepted payload is
//! eventually delivered or explicitly dropped and accounted. At most one
//! drain runs at a time (a tokio mutex owns the shared batch buffer for the
//! duration); drain failures never propagate to callers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use logzio_core::{QueueError, QueueItem};

use crate::batch::{fill_batch, BatchBuffer};
use crate::config::{SenderConfig, SEND_RETRIES};
use crate::queue::{DiskQueue, LogQueue, MemoryQueue};
use crate::stats::{SenderStats, StatsInner};
use crate::transport::{BatchTransport, HttpTransport};

// =============================================================================
// Active Queue
// =============================================================================

/// The queue variant selected at construction.
///
/// Admission branches on the variant rather than going through the trait:
/// the two `len()` semantics (bytes vs. items) must never be mixed into one
/// capacity formula.
#[derive(Debug)]
enum ActiveQueue {
    Memory(MemoryQueue),
    Disk(DiskQueue),
}

impl ActiveQueue {
    /// Variant-correct "anything queued" check.
    ///
    /// The in-memory `len()` is a byte sum and reads zero when the backlog
    /// consists of zero-length payloads, so the drain loop must gate on the
    /// item count instead.
    fn has_pending(&self) -> bool {
        match self {
            ActiveQueue::Memory(q) => q.item_count() > 0,
            ActiveQueue::Disk(q) => q.len() > 0,
        }
    }
}

#[async_trait]
impl LogQueue for ActiveQueue {
    async fn enqueue(&self, payload: &[u8]) -> Result<QueueItem, QueueError> {
        match self {
            ActiveQueue::Memory(q) => q.enqueue(payload).await,
            ActiveQueue::Disk(q) => q.enqueue(payload).await,
        }
    }

    async fn dequeue(&self) -> Result<Option<QueueItem>, QueueError> {
        match self {
            ActiveQueue::Memory(q) => q.dequeue().await,
            ActiveQueue::Disk(q) => q.dequeue().await,
        }
    }

    fn len(&self) -> u64 {
        match self {
            ActiveQueue::Memory(q) => q.len(),
            ActiveQueue::Disk(q) => q.len(),
        }
    }

    async fn close(&self) -> Result<(), QueueError> {
        match self {
            ActiveQueue::Memory(q) => q.close().await,
            ActiveQueue::Disk(q) => q.close().await,
        }
    }
}

// =============================================================================
// Sender
// =============================================================================

/// A buffered, batching log shipper.
///
/// Constructing a sender starts a background task that drains the queue at
/// the configured cadence; [`stop`](LogzioSender::stop) cancels it, performs
/// a final drain and closes the queue. All methods take `&self`; the sender
/// can be shared behind an `Arc` across tasks.
pub struct LogzioSender {
    inner: Arc<Inner>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    token: String,
    url: RwLock<String>,
    queue: ActiveQueue,
    queue_dir: PathBuf,
    transport: Arc<dyn BatchTransport>,
    in_memory_capacity: u64,
    disk_threshold: RwLock<f32>,
    check_disk_space: AtomicBool,
    send_backoff: Duration,
    dropped_logs: AtomicU64,
    draining: AtomicBool,
    drain_state: Mutex<BatchBuffer>,
    shutdown: Notify,
    running: AtomicBool,
    stats: StatsInner,
}

impl LogzioSender {
    /// Creates a sender with the reqwest-backed transport and starts the
    /// periodic drain task. Must be called within a tokio runtime.
    pub async fn new(
        token: impl Into<String>,
        config: SenderConfig,
    ) -> Result<Self, QueueError> {
        let transport = Arc::new(HttpTransport::with_timeout(
            config.compress,
            config.request_timeout,
        ));
        Self::with_transport(token, config, transport).await
    }

    /// Creates a sender with a custom transport (tests, alternative wire
    /// implementations).
    pub async fn with_transport(
        token: impl Into<String>,
        config: SenderConfig,
        transport: Arc<dyn BatchTransport>,
    ) -> Result<Self, QueueError> {
        let token = token.into();
        let queue_dir = config.resolve_queue_dir();

        let queue = if config.in_memory_queue {
            ActiveQueue::Memory(MemoryQueue::new(config.log_count_limit))
        } else {
            ActiveQueue::Disk(DiskQueue::open(&queue_dir).await?)
        };

        // The disk probe only makes sense for the durable variant.
        let check_disk_space = config.check_disk_space && !config.in_memory_queue;

        let inner = Arc::new(Inner {
            url: RwLock::new(compose_url(&config.url, &token)),
            token,
            queue,
            queue_dir,
            transport,
            in_memory_capacity: config.in_memory_capacity,
            disk_threshold: RwLock::new(config.disk_threshold),
            check_disk_space: AtomicBool::new(check_disk_space),
            send_backoff: config.send_backoff,
            dropped_logs: AtomicU64::new(0),
            draining: AtomicBool::new(false),
            drain_state: Mutex::new(BatchBuffer::new()),
            shutdown: Notify::new(),
            running: AtomicBool::new(true),
            stats: StatsInner::default(),
        });

        let driver = Inner::spawn_driver(&inner, config.drain_interval);

        info!(
            url = %inner.url.read(),
            in_memory = config.in_memory_queue,
            drain_interval_ms = config.drain_interval.as_millis() as u64,
            "sender started"
        );

        Ok(Self {
            inner,
            driver: Mutex::new(Some(driver)),
        })
    }

    /// Hands a payload to the shipper.
    ///
    /// Returns `Err` only on storage failure. An admission rejection is
    /// silent: the call succeeds, the payload is dropped, and the drop is
    /// reported to the server in the next successful request's header.
    pub async fn send(&self, payload: &[u8]) -> Result<(), QueueError> {
        self.inner.enqueue_admitted(payload).await
    }

    /// `io::Write`-style adapter: [`send`](Self::send), then report the
    /// payload length as written.
    pub async fn write(&self, payload: &[u8]) -> Result<usize, QueueError> {
        self.send(payload).await?;
        Ok(payload.len())
    }

    /// Drains the queue now: batches, posts, retries, requeues. Serialized
    /// against the periodic task and other callers; failures are absorbed.
    pub async fn drain(&self) {
        self.inner.drain().await;
    }

    /// Alias for [`drain`](Self::drain) that always reports success.
    pub async fn sync(&self) -> Result<(), QueueError> {
        self.inner.drain().await;
        Ok(())
    }

    /// Stops the periodic task, performs a final drain and closes the
    /// queue. Further `send` calls fail with [`QueueError::Closed`].
    pub async fn stop(&self) -> Result<(), QueueError> {
        self.inner.running.store(false, Ordering::SeqCst);
        self.inner.shutdown.notify_one();

        let driver = self.driver.lock().await.take();
        if let Some(handle) = driver {
            if let Err(e) = handle.await {
                warn!(error = %e, "drain task did not shut down cleanly");
            }
        }

        self.inner.drain().await;
        self.inner.queue.close().await
    }

    /// Drops idle pooled connections held by the transport.
    pub fn close_idle_connections(&self) {
        self.inner.transport.close_idle_connections();
    }

    /// Points the sender at a different listener. The authentication token
    /// is re-appended as a query parameter (unless the token is empty).
    pub fn set_url(&self, base_url: &str) {
        let url = compose_url(base_url, &self.inner.token);
        debug!(url = %url, "listener url updated");
        *self.inner.url.write() = url;
    }

    /// Returns the fully composed listener URL.
    pub fn url(&self) -> String {
        self.inner.url.read().clone()
    }

    /// Adjusts the disk-used percent admission threshold at runtime.
    pub fn set_disk_threshold(&self, percent: f32) {
        *self.inner.disk_threshold.write() = percent.clamp(0.0, 100.0);
    }

    /// Number of payloads rejected by admission since the last successful
    /// delivery (reset on HTTP 200).
    pub fn dropped_logs(&self) -> u64 {
        self.inner.dropped_logs.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of cumulative sender statistics.
    pub fn stats(&self) -> SenderStats {
        self.inner.stats.snapshot()
    }
}

impl fmt::Debug for LogzioSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogzioSender")
            .field("url", &*self.inner.url.read())
            .field("queue_len", &self.inner.queue.len())
            .field(
                "dropped_logs",
                &self.inner.dropped_logs.load(Ordering::Relaxed),
            )
            .field("draining", &self.inner.draining.load(Ordering::Relaxed))
            .finish()
    }
}

// =============================================================================
// Admission
// =============================================================================

impl Inner {
    async fn enqueue_admitted(&self, payload: &[u8]) -> Result<(), QueueError> {
        let admitted = match &self.queue {
            ActiveQueue::Disk(_) => self.has_disk_headroom(),
            ActiveQueue::Memory(q) => self.has_memory_headroom(q, payload.len()),
        };
        if !admitted {
            return Ok(());
        }

        self.queue.enqueue(payload).await?;
        self.stats.record_enqueued(payload.len() as u64);
        Ok(())
    }

    /// Disk admission: reject while the filesystem holding the queue
    /// directory is fuller than the threshold. A failing probe latches the
    /// check off and rejects once.
    fn has_disk_headroom(&self) -> bool {
        if !self.check_disk_space.load(Ordering::Relaxed) {
            return true;
        }

        let used = match disk_used_percent(&self.queue_dir) {
            Ok(percent) => percent,
            Err(e) => {
                warn!(
                    dir = %self.queue_dir.display(),
                    error = %e,
                    "disk usage probe failed, disabling the disk space check"
                );
                self.check_disk_space.store(false, Ordering::Relaxed);
                return false;
            }
        };

        let threshold = *self.disk_threshold.read();
        if used > threshold {
            debug!(
                used_percent = used,
                threshold, "dropping log, filesystem usage above threshold"
            );
            self.dropped_logs.fetch_add(1, Ordering::Relaxed);
            self.stats.record_dropped();
            return false;
        }
        true
    }

    /// In-memory admission: reject when the incoming payload would meet or
    /// exceed the byte capacity, or when the item-count cap is reached.
    fn has_memory_headroom(&self, queue: &MemoryQueue, incoming: usize) -> bool {
        let used = queue.len();
        if queue.at_capacity() || used + incoming as u64 >= self.in_memory_capacity {
            debug!(
                capacity = self.in_memory_capacity,
                used,
                incoming,
                "dropping log, in-memory queue at capacity"
            );
            self.dropped_logs.fetch_add(1, Ordering::Relaxed);
            self.stats.record_dropped();
            return false;
        }
        true
    }
}

/// Returns the used percentage of the filesystem holding `path`.
fn disk_used_percent(path: &Path) -> std::io::Result<f32> {
    let total = fs2::total_space(path)?;
    let available = fs2::available_space(path)?;
    if total == 0 {
        return Ok(0.0);
    }
    Ok(((total - available) as f64 / total as f64 * 100.0) as f32)
}

// =============================================================================
// Drain Controller
// =============================================================================

impl Inner {
    async fn drain(&self) {
        if self.draining.load(Ordering::Relaxed) {
            debug!("already draining");
        }

        let mut buf = self.drain_state.lock().await;
        self.draining.store(true, Ordering::Relaxed);
        self.stats.record_drain();
        debug!("draining queue");

        let mut carry: Option<Vec<u8>> = None;
        let mut re_drain = true;

        while (self.queue.has_pending() || carry.is_some()) && re_drain {
            buf.reset();
            let outcome = fill_batch(&self.queue, &mut buf, &mut carry).await;
            if outcome.discarded > 0 {
                self.stats.record_oversized(outcome.discarded);
            }
            if outcome.bytes == 0 {
                if outcome.discarded == 0 {
                    // No progress; the queue is unreadable or lied about
                    // its length. Give up until the next drain.
                    break;
                }
                continue;
            }

            let mut backoff = self.send_backoff;
            let mut backoff_before_attempt = false;

            for attempt in 0..SEND_RETRIES {
                if backoff_before_attempt {
                    debug!(
                        backoff_ms = backoff.as_millis() as u64,
                        attempt, "retrying batch after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }

                let url = self.url.read().clone();
                let dropped = self.dropped_logs.load(Ordering::Relaxed);
                let status = self.transport.post(&url, buf.as_bytes(), attempt, dropped).await;

                if status.is_success() {
                    self.dropped_logs.store(0, Ordering::Relaxed);
                }

                if status.should_retry() {
                    debug!(%status, attempt, "batch delivery failed");
                    self.stats.record_failed_post();
                    backoff_before_attempt = true;
                    if attempt == SEND_RETRIES - 1 {
                        self.requeue(buf.as_bytes()).await;
                        re_drain = false;
                    }
                } else {
                    if status.is_success() {
                        self.stats.record_batch_sent(buf.len() as u64);
                    } else {
                        // Non-retriable client error; the batch is consumed
                        // and dropped.
                        warn!(%status, bytes = buf.len(), "batch rejected, not retrying");
                    }
                    break;
                }
            }
        }

        // A payload parked for the next batch must survive an aborted drain.
        if let Some(value) = carry.take() {
            if let Err(e) = self.queue.enqueue(&value).await {
                error!(error = %e, "failed to return parked payload to the queue");
            }
        }

        self.draining.store(false, Ordering::Relaxed);
    }

    /// Re-inserts an undeliverable batch as a single combined item through
    /// the normal admission path.
    async fn requeue(&self, batch: &[u8]) {
        debug!(bytes = batch.len(), "requeueing batch after exhausted retries");
        self.stats.record_requeue();
        if let Err(e) = self.enqueue_admitted(batch).await {
            error!(error = %e, "failed to requeue batch");
        }
    }

    fn spawn_driver(inner: &Arc<Inner>, interval: Duration) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            debug!(
                interval_ms = interval.as_millis() as u64,
                "periodic drain task started"
            );
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        if !inner.running.load(Ordering::SeqCst) {
                            break;
                        }
                        inner.drain().await;
                    }
                    _ = inner.shutdown.notified() => break,
                }
            }
            debug!("periodic drain task stopped");
        })
    }
}

fn compose_url(base_url: &str, token: &str) -> String {
    if token.is_empty() {
        base_url.to_string()
    } else {
        format!("{}/?token={}", base_url, token)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_BATCH_SIZE;
    use crate::transport::{MockTransport, PostStatus};
    use tempfile::TempDir;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn memory_sender(
        config: SenderConfig,
        transport: Arc<MockTransport>,
    ) -> LogzioSender {
        LogzioSender::with_transport("fake-token", config, transport)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_url_composed_with_token() {
        let config = SenderConfig {
            url: "http://localhost:12345".to_string(),
            ..SenderConfig::for_testing()
        };
        let sender = LogzioSender::with_transport("token", config, Arc::new(MockTransport::new()))
            .await
            .unwrap();

        assert_eq!(sender.url(), "http://localhost:12345/?token=token");
        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_token_skips_url_rewrite() {
        let config = SenderConfig::for_testing();
        let sender = LogzioSender::with_transport("", config, Arc::new(MockTransport::new()))
            .await
            .unwrap();

        sender.set_url("http://localhost:12345");
        assert_eq!(sender.url(), "http://localhost:12345");
        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_set_url_recomposes_token() {
        let sender = LogzioSender::with_transport(
            "token",
            SenderConfig::for_testing(),
            Arc::new(MockTransport::new()),
        )
        .await
        .unwrap();

        sender.set_url("http://localhost:12345");
        assert_eq!(sender.url(), "http://localhost:12345/?token=token");
        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_in_memory_capacity_rejects() {
        let transport = Arc::new(MockTransport::new());
        let config = SenderConfig {
            in_memory_capacity: 500,
            ..SenderConfig::for_testing()
        };
        let sender = memory_sender(config, transport).await;

        // Too large outright: 0 + 1000 >= 500.
        sender.send(&vec![b'a'; 1000]).await.unwrap();
        assert_eq!(sender.dropped_logs(), 1);
        assert!(sender.inner.queue.dequeue().await.unwrap().is_none());

        sender.send(&vec![b'b'; 200]).await.unwrap();
        // 200 + 400 >= 500: rejected.
        sender.send(&vec![b'c'; 400]).await.unwrap();
        assert_eq!(sender.dropped_logs(), 2);

        let item = sender.inner.queue.dequeue().await.unwrap().unwrap();
        assert_eq!(item.value.len(), 200);
        assert!(sender.inner.queue.dequeue().await.unwrap().is_none());

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_log_count_limit_rejects() {
        let transport = Arc::new(MockTransport::new());
        let config = SenderConfig {
            log_count_limit: 2,
            ..SenderConfig::for_testing()
        };
        let sender = memory_sender(config, transport).await;

        sender.send(b"one").await.unwrap();
        sender.send(b"two").await.unwrap();
        sender.send(b"three").await.unwrap();

        assert_eq!(sender.dropped_logs(), 1);
        assert_eq!(sender.stats().logs_enqueued, 2);

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_retry_exhaustion_requeues_batch() {
        let transport = Arc::new(MockTransport::failing());
        let sender = memory_sender(SenderConfig::for_testing(), transport.clone()).await;

        sender.send(b"blah").await.unwrap();
        sender.drain().await;

        // Four attempts, same body each time, attempt numbers 0..=3.
        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        for (i, request) in requests.iter().enumerate() {
            assert_eq!(request.body, b"blah\n");
            assert_eq!(request.attempt, i);
        }

        // The whole batch was requeued as one item.
        let item = sender.inner.queue.dequeue().await.unwrap().unwrap();
        assert_eq!(item.value, b"blah\n");
        assert!(sender.inner.queue.dequeue().await.unwrap().is_none());
        assert_eq!(sender.stats().requeues, 1);

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_unauthorized_batch_is_dropped_without_retry() {
        let transport = Arc::new(MockTransport::with_script([
            PostStatus::Http(401),
            PostStatus::Http(202),
        ]));
        let sender = memory_sender(SenderConfig::for_testing(), transport.clone()).await;

        assert_eq!(sender.write(b"blah").await.unwrap(), 4);
        sender.sync().await.unwrap();
        sender.drain().await;

        // The 401 consumed the batch: one request total, no retries, and
        // the server observed the payload on that request.
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body, b"blah\n");
        assert!(sender.inner.queue.is_empty());

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_count_reported_then_reset() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::new());
        let config = SenderConfig {
            in_memory_queue: false,
            queue_dir: Some(temp.path().to_path_buf()),
            disk_threshold: 0.0,
            ..SenderConfig::for_testing()
        };
        let sender = LogzioSender::with_transport("fake-token", config, transport.clone())
            .await
            .unwrap();

        // Threshold 0: every send is rejected (the store itself occupies
        // space on the filesystem, so usage is above zero).
        for _ in 0..3 {
            sender.send(b"blah").await.unwrap();
        }
        assert_eq!(sender.dropped_logs(), 3);
        assert_eq!(sender.inner.queue.len(), 0);

        sender.set_disk_threshold(100.0);
        sender.send(b"blah").await.unwrap();
        sender.send(b"blah").await.unwrap();
        sender.drain().await;

        // The delivery carried the dropped count, then the 200 reset it.
        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].dropped, 3);
        assert_eq!(requests[0].body, b"blah\nblah\n");
        assert_eq!(sender.dropped_logs(), 0);
        assert_eq!(sender.inner.queue.len(), 0);

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_disk_probe_disabled_accepts_everything() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(MockTransport::new());
        let config = SenderConfig {
            in_memory_queue: false,
            queue_dir: Some(temp.path().to_path_buf()),
            disk_threshold: 0.0,
            check_disk_space: false,
            ..SenderConfig::for_testing()
        };
        let sender = LogzioSender::with_transport("fake-token", config, transport)
            .await
            .unwrap();

        sender.send(b"blah").await.unwrap();
        assert_eq!(sender.dropped_logs(), 0);
        assert_eq!(sender.inner.queue.len(), 1);

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_splits_backlog_into_capped_batches() {
        let transport = Arc::new(MockTransport::new());
        let sender = memory_sender(SenderConfig::for_testing(), transport.clone()).await;

        for _ in 0..100 {
            sender.send(&vec![b'x'; 33_000]).await.unwrap();
        }
        sender.drain().await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        let mut total = 0;
        for request in &requests {
            assert!(request.body.len() <= MAX_BATCH_SIZE);
            total += request.body.len();
        }
        // The boundary payload is carried into the next batch, not lost.
        assert_eq!(total, 100 * 33_001);
        assert!(sender.inner.queue.is_empty());

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_write_and_sync_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(query_param("token", "fake-token"))
            .and(header("Content-Type", "text/plain"))
            .and(header("logzio-shipper", "logzio-go/v1.0.0/0/0"))
            .and(body_string("blah\n"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = SenderConfig {
            url: server.uri(),
            ..SenderConfig::for_testing()
        };
        let sender = LogzioSender::new("fake-token", config).await.unwrap();

        assert_eq!(sender.write(b"blah").await.unwrap(), 4);
        sender.sync().await.unwrap();

        assert!(sender.inner.queue.is_empty());
        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_drains_then_closes() {
        let transport = Arc::new(MockTransport::new());
        let sender = memory_sender(SenderConfig::for_testing(), transport.clone()).await;

        sender.send(b"blah").await.unwrap();
        sender.stop().await.unwrap();

        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.requests()[0].body, b"blah\n");
        assert!(matches!(
            sender.send(b"late").await,
            Err(QueueError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_periodic_driver_drains_without_manual_call() {
        let transport = Arc::new(MockTransport::new());
        let config = SenderConfig {
            drain_interval: Duration::from_millis(50),
            ..SenderConfig::for_testing()
        };
        let sender = memory_sender(config, transport.clone()).await;

        sender.send(b"blah").await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(transport.request_count() >= 1);
        assert!(sender.inner.queue.is_empty());

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_zero_length_payloads_still_drain() {
        let transport = Arc::new(MockTransport::new());
        let sender = memory_sender(SenderConfig::for_testing(), transport.clone()).await;

        sender.send(b"").await.unwrap();
        // The byte-sum length reads zero even though an item is queued.
        assert_eq!(sender.inner.queue.len(), 0);
        assert!(sender.inner.queue.has_pending());

        sender.drain().await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body, b"\n");
        assert!(sender.inner.queue.dequeue().await.unwrap().is_none());

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_count_reset_only_on_200() {
        let transport = Arc::new(MockTransport::with_script([PostStatus::Http(400)]));
        let config = SenderConfig {
            in_memory_capacity: 500,
            ..SenderConfig::for_testing()
        };
        let sender = memory_sender(config, transport.clone()).await;

        // One admission drop, then an accepted payload.
        sender.send(&vec![b'a'; 1000]).await.unwrap();
        sender.send(b"blah").await.unwrap();
        assert_eq!(sender.dropped_logs(), 1);

        sender.drain().await;

        // 400 consumed the batch but must not reset the counter.
        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.requests()[0].dropped, 1);
        assert_eq!(sender.dropped_logs(), 1);

        sender.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_senders_all_arrive() {
        let transport = Arc::new(MockTransport::new());
        let sender = Arc::new(memory_sender(SenderConfig::for_testing(), transport.clone()).await);

        let mut handles = vec![];
        for _ in 0..8 {
            let s = sender.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    s.send(b"payload").await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        sender.drain().await;

        let total: usize = transport
            .requests()
            .iter()
            .map(|r| r.body.len())
            .sum();
        assert_eq!(total, 8 * 50 * 8); // 400 payloads of "payload\n"
        assert!(sender.inner.queue.is_empty());

        sender.stop().await.unwrap();
    }
}
