// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Durable queue implementation backed by RocksDB.
//!
//! Payloads are stored verbatim under 9-byte keys: a `0x00` prefix followed
//! by a big-endian monotonic identifier, so lexicographic key order is FIFO
//! order. A single meta key (prefix `0x01`, sorting after every data key)
//! persists the next identifier, keeping ids increasing across restarts.
//!
//! Writes go through `WriteOptions::set_sync(true)`: an enqueued payload is
//! fsync-durable by the time `enqueue` returns. All RocksDB calls run under
//! `spawn_blocking` to keep the async runtime unblocked.
//!
//! Counters are reconstructed by a full scan on open; a queue reopened
//! against the same directory replays items enqueued by a prior process in
//! FIFO order.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{DBCompressionType, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use tracing::{debug, info};

use logzio_core::{QueueError, QueueItem};

use crate::queue::LogQueue;

// =============================================================================
// Key Layout
// =============================================================================

/// Data keys: prefix byte + big-endian id.
const DATA_PREFIX: u8 = 0x00;

/// Meta key; the `0x01` prefix sorts it after every data key.
const META_KEY: [u8; 1] = [0x01];

/// Data key size: 1 prefix byte + 8 id bytes.
const KEY_SIZE: usize = 9;

fn data_key(id: u64) -> [u8; KEY_SIZE] {
    let mut key = [DATA_PREFIX; KEY_SIZE];
    key[1..].copy_from_slice(&id.to_be_bytes());
    key
}

fn key_id(key: &[u8]) -> Result<u64, QueueError> {
    if key.len() != KEY_SIZE || key[0] != DATA_PREFIX {
        return Err(QueueError::corrupted(format!(
            "unexpected key layout ({} bytes)",
            key.len()
        )));
    }
    let mut id = [0u8; 8];
    id.copy_from_slice(&key[1..]);
    Ok(u64::from_be_bytes(id))
}

// =============================================================================
// Disk Queue
// =============================================================================

/// A persistent FIFO of log payloads rooted at a directory.
///
/// `len()` reports the item count (contrast with
/// [`MemoryQueue`](crate::queue::MemoryQueue), which reports bytes).
#[derive(Debug)]
pub struct DiskQueue {
    /// RocksDB instance.
    db: Arc<DB>,

    /// Queue directory.
    dir: PathBuf,

    /// Next identifier to assign.
    next_id: AtomicU64,

    /// O(1) item count.
    item_count: AtomicU64,

    /// Serializes head removal; two dequeuers must not read the same head.
    head_lock: Arc<Mutex<()>>,

    /// Set once by `close`.
    closed: AtomicBool,
}

impl DiskQueue {
    /// Opens (or creates) a durable queue at `dir`, recovering any items a
    /// prior process left behind.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let dir = dir.into();
        let path = dir.clone();

        let (db, next_id, item_count) =
            tokio::task::spawn_blocking(move || -> Result<_, QueueError> {
                std::fs::create_dir_all(&path).map_err(|e| {
                    QueueError::storage_with(
                        format!("failed to create queue directory {}", path.display()),
                        e,
                    )
                })?;

                let db = Self::open_db(&path)
                    .map_err(|e| QueueError::storage_with("failed to open queue store", e))?;
                let (next_id, item_count) = Self::reconstruct(&db)?;
                Ok((db, next_id, item_count))
            })
            .await
            .map_err(|e| QueueError::storage_with("queue open task failed", e))??;

        info!(
            dir = %dir.display(),
            items = item_count,
            next_id,
            "durable queue opened"
        );

        Ok(Self {
            db: Arc::new(db),
            dir,
            next_id: AtomicU64::new(next_id),
            item_count: AtomicU64::new(item_count),
            head_lock: Arc::new(Mutex::new(())),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the queue directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn open_db(path: &Path) -> Result<DB, rocksdb::Error> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(DBCompressionType::Lz4);
        opts.set_max_background_jobs(2);
        DB::open(&opts, path)
    }

    /// Rebuilds `next_id` and the item count from the store.
    ///
    /// The meta key alone can lag behind the data keys when concurrent
    /// enqueues race a crash, so the recovered next id is the maximum of the
    /// meta value and `last data key + 1`.
    fn reconstruct(db: &DB) -> Result<(u64, u64), QueueError> {
        let mut item_count = 0u64;
        let mut last_id = 0u64;

        for entry in db.iterator(IteratorMode::Start) {
            let (key, _) =
                entry.map_err(|e| QueueError::storage_with("failed scanning queue store", e))?;
            if key.as_ref() == META_KEY.as_slice() {
                continue;
            }
            last_id = key_id(&key)?;
            item_count += 1;
        }

        let meta_next = match db
            .get(META_KEY)
            .map_err(|e| QueueError::storage_with("failed reading queue meta", e))?
        {
            Some(bytes) if bytes.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes);
                u64::from_be_bytes(buf)
            }
            Some(_) => return Err(QueueError::corrupted("queue meta has unexpected length")),
            None => 1,
        };

        let next_id = meta_next.max(last_id + 1).max(1);
        debug!(items = item_count, next_id, "queue counters reconstructed");
        Ok((next_id, item_count))
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
impl LogQueue for DiskQueue {
    async fn enqueue(&self, payload: &[u8]) -> Result<QueueItem, QueueError> {
        self.ensure_open()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let value = payload.to_vec();
        let db = self.db.clone();
        let stored = value.clone();

        tokio::task::spawn_blocking(move || {
            let mut batch = WriteBatch::default();
            batch.put(data_key(id), &stored);
            batch.put(META_KEY, (id + 1).to_be_bytes());

            let mut write_opts = WriteOptions::default();
            write_opts.set_sync(true);
            db.write_opt(batch, &write_opts)
                .map_err(|e| QueueError::storage_with("failed to persist queue item", e))
        })
        .await
        .map_err(|e| QueueError::storage_with("enqueue task failed", e))??;

        self.item_count.fetch_add(1, Ordering::Relaxed);
        Ok(QueueItem::with_id(id, value))
    }

    async fn dequeue(&self) -> Result<Option<QueueItem>, QueueError> {
        self.ensure_open()?;

        let db = self.db.clone();
        let head_lock = self.head_lock.clone();

        let removed = tokio::task::spawn_blocking(move || -> Result<_, QueueError> {
            let _guard = head_lock.lock();

            let head = match db.iterator(IteratorMode::Start).next() {
                Some(entry) => {
                    entry.map_err(|e| QueueError::storage_with("failed reading queue head", e))?
                }
                None => return Ok(None),
            };

            let (key, value) = head;
            if key.as_ref() == META_KEY.as_slice() {
                // Meta sorts after every data key, so a meta head means empty.
                return Ok(None);
            }
            let id = key_id(&key)?;

            db.delete(&key)
                .map_err(|e| QueueError::storage_with("failed removing queue head", e))?;

            Ok(Some(QueueItem::with_id(id, value.into_vec())))
        })
        .await
        .map_err(|e| QueueError::storage_with("dequeue task failed", e))??;

        if removed.is_some() {
            self.item_count.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(removed)
    }

    /// Returns the current item count.
    #[inline]
    fn len(&self) -> u64 {
        self.item_count.load(Ordering::Relaxed)
    }

    async fn close(&self) -> Result<(), QueueError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            db.flush()
                .map_err(|e| QueueError::storage_with("failed flushing queue store", e))
        })
        .await
        .map_err(|e| QueueError::storage_with("close task failed", e))??;

        debug!(dir = %self.dir.display(), "durable queue closed");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
