// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! RocksDB-backed raw key-value store.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rocksdb::{
    DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options, WriteBatch, WriteOptions,
};
use tracing::{info, instrument};

use super::raw::{RawKvClient, RawKvPair};
use super::StorageError;

type Db = DBWithThreadMode<MultiThreaded>;

/// Durability mode for write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurabilityMode {
    /// Writes are synced to WAL but not fsynced to disk.
    /// Durable against process crashes but not power failures.
    /// This is the default mode, balancing performance and safety.
    #[default]
    WalOnly,
    /// Writes are fsynced to disk on every operation.
    /// Durable against power failures but slower (~20μs per write).
    FsyncEveryWrite,
}

/// RocksDB-backed raw store.
///
/// Keys are kept in RocksDB's default byte-order comparator, which is the
/// order the MVCC key encoding relies on. Every call runs on tokio's blocking
/// pool.
///
/// `close` drops the handle, so the database lock is released once in-flight
/// calls finish and the path can be opened again.
pub struct RocksRawKv {
    db: RwLock<Option<Arc<Db>>>,
    durability: DurabilityMode,
}

impl RocksRawKv {
    /// Opens or creates a RocksDB database at the given path.
    ///
    /// Uses `DurabilityMode::WalOnly` by default (fast, durable against process crash).
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Self::open_with_durability(path, DurabilityMode::default())
    }

    /// Opens or creates a RocksDB database with specified durability mode.
    pub fn open_with_durability(
        path: &Path,
        durability: DurabilityMode,
    ) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        opts.set_write_buffer_size(64 * 1024 * 1024); // 64MB
        opts.set_max_write_buffer_number(4);
        opts.set_target_file_size_base(64 * 1024 * 1024);
        opts.set_level_compaction_dynamic_level_bytes(true);

        // Snapshot reads are bounded scans starting at an exact version key
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);

        Self::open_with_options(path, opts, durability)
    }

    /// Opens a database with custom RocksDB options.
    pub fn open_with_options(
        path: &Path,
        opts: Options,
        durability: DurabilityMode,
    ) -> Result<Self, StorageError> {
        let db = Db::open(&opts, path)?;
        info!(path = %path.display(), ?durability, "Opened RocksDB raw store");

        Ok(Self {
            db: RwLock::new(Some(Arc::new(db))),
            durability,
        })
    }

    /// Forces a flush of memtables to disk.
    pub async fn sync(&self) -> Result<(), StorageError> {
        self.blocking(|db| Ok(db.flush()?)).await
    }

    fn handle(&self) -> Result<Arc<Db>, StorageError> {
        self.db.read().clone().ok_or(StorageError::Closed)
    }

    fn write_opts(durability: DurabilityMode) -> WriteOptions {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(durability == DurabilityMode::FsyncEveryWrite);
        write_opts
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Db) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.handle()?;
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StorageError::Internal(format!("rocksdb task failed: {}", e)))?
    }
}

#[async_trait]
impl RawKvClient for RocksRawKv {
    fn name(&self) -> &str {
        "RocksDB storage"
    }

    async fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        let durability = self.durability;
        self.blocking(move |db| Ok(db.put_opt(&key, &value, &Self::write_opts(durability))?))
            .await
    }

    async fn batch_put(&self, pairs: Vec<RawKvPair>) -> Result<(), StorageError> {
        let durability = self.durability;
        self.blocking(move |db| {
            let mut batch = WriteBatch::default();
            for (key, value) in &pairs {
                batch.put(key, value);
            }
            db.write_opt(batch, &Self::write_opts(durability))?;
            Ok(())
        })
        .await
    }

    async fn scan(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<RawKvPair>, StorageError> {
        let (start, end) = (start.to_vec(), end.to_vec());
        self.blocking(move |db| {
            let mut pairs = Vec::with_capacity(limit.min(1024));
            let iter = db.iterator(IteratorMode::From(&start, Direction::Forward));

            for item in iter {
                if pairs.len() >= limit {
                    break;
                }
                let (key, value) = item?;
                if !end.is_empty() && key.as_ref() >= end.as_slice() {
                    break;
                }
                pairs.push((key.to_vec(), value.to_vec()));
            }

            Ok(pairs)
        })
        .await
    }

    async fn reverse_scan(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<RawKvPair>, StorageError> {
        let (start, end) = (start.to_vec(), end.to_vec());
        self.blocking(move |db| {
            let mut pairs = Vec::with_capacity(limit.min(1024));
            let mode = if end.is_empty() {
                IteratorMode::End
            } else {
                // Positions at the last key <= end
                IteratorMode::From(&end, Direction::Reverse)
            };

            for item in db.iterator(mode) {
                if pairs.len() >= limit {
                    break;
                }
                let (key, value) = item?;
                if !end.is_empty() && key.as_ref() >= end.as_slice() {
                    continue;
                }
                if key.as_ref() < start.as_slice() {
                    break;
                }
                pairs.push((key.to_vec(), value.to_vec()));
            }

            Ok(pairs)
        })
        .await
    }

    async fn delete_range(&self, start: &[u8], end: &[u8]) -> Result<(), StorageError> {
        let (start, end) = (start.to_vec(), end.to_vec());
        let durability = self.durability;
        self.blocking(move |db| {
            let mut batch = WriteBatch::default();
            if end.is_empty() {
                for item in db.iterator(IteratorMode::From(&start, Direction::Forward)) {
                    let (key, _) = item?;
                    batch.delete(key);
                }
            } else if start < end {
                batch.delete_range(&start, &end);
            }
            db.write_opt(batch, &Self::write_opts(durability))?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self), fields(store = "rocksdb"))]
    async fn close(&self) -> Result<(), StorageError> {
        let Some(db) = self.db.write().take() else {
            return Ok(());
        };
        // The last clone closes the database when dropped
        tokio::task::spawn_blocking(move || db.flush())
            .await
            .map_err(|e| StorageError::Internal(format!("rocksdb task failed: {}", e)))??;
        info!("Closed RocksDB raw store");
        Ok(())
    }
}
