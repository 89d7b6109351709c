// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Versioned store over a raw key-value client.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::context::Context;

use super::key::successor;
use super::{
    decode_mvcc_key, encode_mvcc_key, key_boundary, user_key_prefix, Key, MemoryRawKv,
    MvccStore, RawKvClient, RawKvPair, RocksRawKv, StorageError, StoreConfig, Timestamp, Value,
};

/// Snapshot reads, history deletes and range scans on top of a [`RawKvClient`].
///
/// The store owns the client handle. Build it once, share it by reference or
/// `Arc`, and release it with [`MvccStore::close`].
pub struct VersionedStore<C: RawKvClient> {
    client: Arc<C>,
    config: StoreConfig,
    closed: AtomicBool,
}

impl<C: RawKvClient> VersionedStore<C> {
    /// Wraps a raw client.
    pub fn new(client: C, config: StoreConfig) -> Self {
        Self::from_arc(Arc::new(client), config)
    }

    /// Wraps a raw client that is already shared.
    pub fn from_arc(client: Arc<C>, config: StoreConfig) -> Self {
        Self {
            client,
            config,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the raw client.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    /// Validates key size.
    fn validate_key(&self, key: &Key) -> Result<(), StorageError> {
        if key.len() > self.config.max_key_size {
            return Err(StorageError::KeyTooLarge {
                size: key.len(),
                max: self.config.max_key_size,
            });
        }
        Ok(())
    }

    /// Validates value size.
    fn validate_value(&self, value: &Value) -> Result<(), StorageError> {
        if value.len() > self.config.max_value_size {
            return Err(StorageError::ValueTooLarge {
                size: value.len(),
                max: self.config.max_value_size,
            });
        }
        Ok(())
    }

    fn scan_page_size(&self) -> usize {
        self.config.scan_batch_size.max(1)
    }
}

impl VersionedStore<MemoryRawKv> {
    /// Creates a store over a fresh in-memory raw store.
    pub fn in_memory(config: StoreConfig) -> Self {
        Self::new(MemoryRawKv::new(), config)
    }
}

impl VersionedStore<RocksRawKv> {
    /// Opens or creates a RocksDB-backed store at the given path.
    pub fn open(path: &Path, config: StoreConfig) -> Result<Self, StorageError> {
        Ok(Self::new(RocksRawKv::open(path)?, config))
    }
}

/// Removes every version of `key` with timestamp `<= ts`.
///
/// Versions `<= ts` occupy `[encode(key, ts), boundary(key))` because newer
/// versions sort first.
async fn delete_versions<C: RawKvClient>(
    client: &C,
    key: &Key,
    ts: Timestamp,
) -> Result<(), StorageError> {
    client
        .delete_range(&encode_mvcc_key(key, ts), &key_boundary(key))
        .await
}

#[async_trait]
impl<C: RawKvClient> MvccStore for VersionedStore<C> {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn get(
        &self,
        ctx: &Context,
        key: &Key,
        ts: Timestamp,
    ) -> Result<Option<Value>, StorageError> {
        self.ensure_open()?;
        self.validate_key(key)?;

        // The first entry at or after encode(key, ts) is the newest version <= ts
        let start = encode_mvcc_key(key, ts);
        let end = key_boundary(key);
        let mut pairs = ctx.run(self.client.scan(&start, &end, 1)).await?;

        Ok(pairs.pop().map(|(_, value)| Value::new(value)))
    }

    async fn set(
        &self,
        ctx: &Context,
        key: &Key,
        value: Value,
        ts: Timestamp,
    ) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.validate_key(key)?;
        self.validate_value(&value)?;

        let encoded_key = encode_mvcc_key(key, ts);
        ctx.run(self.client.put(encoded_key, value.into_bytes())).await
    }

    // TODO: fan out across shards like batch_delete_concurrent once batches get large
    #[instrument(level = "debug", skip_all, fields(keys = keys.len(), ts = ts))]
    async fn batch_get(
        &self,
        ctx: &Context,
        keys: &[Key],
        ts: Timestamp,
    ) -> Result<Vec<Option<Value>>, StorageError> {
        self.ensure_open()?;
        let mut values = Vec::with_capacity(keys.len());

        for key in keys {
            values.push(self.get(ctx, key, ts).await?);
        }

        Ok(values)
    }

    #[instrument(level = "debug", skip_all, fields(keys = keys.len(), ts = ts))]
    async fn batch_set(
        &self,
        ctx: &Context,
        keys: &[Key],
        values: Vec<Value>,
        ts: Timestamp,
    ) -> Result<(), StorageError> {
        self.ensure_open()?;
        if keys.len() != values.len() {
            return Err(StorageError::InvalidArgument(format!(
                "batch_set got {} keys and {} values",
                keys.len(),
                values.len()
            )));
        }
        if keys.is_empty() {
            return Ok(());
        }

        let mut pairs: Vec<RawKvPair> = Vec::with_capacity(keys.len());
        for (key, value) in keys.iter().zip(values) {
            self.validate_key(key)?;
            self.validate_value(&value)?;
            pairs.push((encode_mvcc_key(key, ts), value.into_bytes()));
        }

        ctx.run(self.client.batch_put(pairs)).await
    }

    async fn delete(&self, ctx: &Context, key: &Key, ts: Timestamp) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.validate_key(key)?;

        ctx.run(delete_versions(self.client.as_ref(), key, ts)).await
    }

    #[instrument(level = "debug", skip_all, fields(keys = keys.len(), ts = ts))]
    async fn batch_delete(
        &self,
        ctx: &Context,
        keys: &[Key],
        ts: Timestamp,
    ) -> Result<(), StorageError> {
        self.ensure_open()?;
        for key in keys {
            self.delete(ctx, key, ts).await?;
        }
        Ok(())
    }

    #[instrument(
        level = "debug",
        skip_all,
        fields(keys = keys.len(), ts = ts, shard_size = self.config.batch_delete_shard_size)
    )]
    async fn batch_delete_concurrent(
        &self,
        ctx: &Context,
        keys: &[Key],
        ts: Timestamp,
    ) -> Result<(), StorageError> {
        self.ensure_open()?;
        if keys.is_empty() {
            return Ok(());
        }
        for key in keys {
            self.validate_key(key)?;
        }
        ctx.check()?;

        let total = keys.len();
        let shard_size = self.config.batch_delete_shard_size.max(1);
        // Cancelled on the first failure; only keys not yet issued are skipped
        let stop = ctx.child();
        let (tx, mut rx) = mpsc::channel::<Result<(), StorageError>>(total);
        let mut shards = JoinSet::new();

        for shard in keys.chunks(shard_size) {
            let shard = shard.to_vec();
            let client = Arc::clone(&self.client);
            let ctx = ctx.clone();
            let stop = stop.clone();
            let tx = tx.clone();

            shards.spawn(async move {
                for key in &shard {
                    let result = if stop.is_cancelled() {
                        Err(StorageError::Cancelled)
                    } else {
                        ctx.run(delete_versions(client.as_ref(), key, ts)).await
                    };
                    // Skip every key not yet issued, this shard included
                    if result.is_err() {
                        stop.cancel();
                    }
                    if tx.send(result).await.is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);
        debug!(shards = shards.len(), "Spawned batch delete shards");

        let mut first_error = None;
        let mut received = 0;
        // Drain every result even after a failure so no shard is left blocked
        while received < total {
            let Some(result) = rx.recv().await else {
                break;
            };
            received += 1;
            if let Err(e) = result {
                if first_error.is_none() {
                    warn!(error = %e, "Batch delete failed, cancelling remaining keys");
                    stop.cancel();
                    first_error = Some(e);
                }
            }
        }

        while let Some(joined) = shards.join_next().await {
            if let Err(e) = joined {
                if first_error.is_none() {
                    first_error = Some(StorageError::Internal(format!(
                        "batch delete shard failed: {}",
                        e
                    )));
                }
            }
        }

        debug!(received, failed = first_error.is_some(), "Batch delete finished");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[instrument(level = "debug", skip_all, fields(limit = limit, ts = ts))]
    async fn scan(
        &self,
        ctx: &Context,
        start: &Key,
        end: &Key,
        limit: usize,
        ts: Timestamp,
    ) -> Result<Vec<(Key, Value)>, StorageError> {
        self.ensure_open()?;
        self.validate_key(start)?;
        self.validate_key(end)?;

        let mut results = Vec::with_capacity(limit.min(1024));
        if limit == 0 {
            return Ok(results);
        }

        let page = self.scan_page_size();
        let upper = if end.is_empty() {
            Vec::new()
        } else {
            user_key_prefix(end)
        };
        let mut cursor = user_key_prefix(start);
        // Last user key already answered; its older versions are skipped
        let mut answered: Option<Key> = None;

        loop {
            let pairs = ctx.run(self.client.scan(&cursor, &upper, page)).await?;
            let exhausted = pairs.len() < page;
            let next_cursor = match pairs.last() {
                Some((last, _)) => successor(last),
                None => break,
            };

            for (physical, value) in pairs {
                let (key, version) = decode_mvcc_key(&physical)?;
                if version > ts || answered.as_ref() == Some(&key) {
                    continue;
                }
                answered = Some(key.clone());
                results.push((key, Value::new(value)));
                if results.len() >= limit {
                    return Ok(results);
                }
            }

            if exhausted {
                break;
            }
            debug!(found = results.len(), "Scan fetching next page");
            cursor = next_cursor;
        }

        Ok(results)
    }

    #[instrument(level = "debug", skip_all, fields(limit = limit, ts = ts))]
    async fn reverse_scan(
        &self,
        ctx: &Context,
        start: &Key,
        end: &Key,
        limit: usize,
        ts: Timestamp,
    ) -> Result<Vec<(Key, Value)>, StorageError> {
        self.ensure_open()?;
        self.validate_key(start)?;
        self.validate_key(end)?;

        let mut results = Vec::with_capacity(limit.min(1024));
        if limit == 0 {
            return Ok(results);
        }

        let page = self.scan_page_size();
        let lower = user_key_prefix(start);
        let mut upper = if end.is_empty() {
            Vec::new()
        } else {
            user_key_prefix(end)
        };
        // Walking backwards, a key's versions arrive oldest first. Keep the
        // latest one <= ts until the key changes.
        let mut pending: Option<(Key, Option<Value>)> = None;

        loop {
            let pairs = ctx.run(self.client.reverse_scan(&lower, &upper, page)).await?;
            let exhausted = pairs.len() < page;
            if let Some((last, _)) = pairs.last() {
                upper = last.clone();
            }

            for (physical, value) in pairs {
                let (key, version) = decode_mvcc_key(&physical)?;
                if !matches!(&pending, Some((current, _)) if *current == key) {
                    if let Some((done, Some(visible))) = pending.replace((key, None)) {
                        results.push((done, visible));
                        if results.len() >= limit {
                            return Ok(results);
                        }
                    }
                }
                if version <= ts {
                    if let Some((_, visible)) = pending.as_mut() {
                        *visible = Some(Value::new(value));
                    }
                }
            }

            if exhausted {
                break;
            }
            debug!(found = results.len(), "Reverse scan fetching next page");
        }

        if let Some((key, Some(visible))) = pending {
            results.push((key, visible));
        }
        Ok(results)
    }

    #[instrument(skip(self), fields(store = %self.client.name()))]
    async fn close(&self) -> Result<(), StorageError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match self.client.close().await {
            Ok(()) => {
                debug!("Closed versioned store");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to close raw store");
                Err(e)
            }
        }
    }
}
