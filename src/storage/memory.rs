// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! In-memory raw store backed by an ordered map.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::raw::{RawKvClient, RawKvPair};
use super::StorageError;

/// Raw store that keeps every key in a `BTreeMap`.
///
/// Nothing is persisted. Useful for tests and for embedding without a
/// separate storage process.
#[derive(Debug, Default)]
pub struct MemoryRawKv {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryRawKv {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of physical keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if no physical key is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

fn bounds<'a>(start: &'a [u8], end: &'a [u8]) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
    let upper = if end.is_empty() {
        Bound::Unbounded
    } else {
        Bound::Excluded(end)
    };
    (Bound::Included(start), upper)
}

fn is_empty_range(start: &[u8], end: &[u8]) -> bool {
    !end.is_empty() && start >= end
}

#[async_trait]
impl RawKvClient for MemoryRawKv {
    fn name(&self) -> &str {
        "in-memory storage"
    }

    async fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.data.write().insert(key, value);
        Ok(())
    }

    async fn batch_put(&self, pairs: Vec<RawKvPair>) -> Result<(), StorageError> {
        self.ensure_open()?;
        let mut data = self.data.write();
        for (key, value) in pairs {
            data.insert(key, value);
        }
        Ok(())
    }

    async fn scan(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<RawKvPair>, StorageError> {
        self.ensure_open()?;
        if is_empty_range(start, end) {
            return Ok(Vec::new());
        }
        let data = self.data.read();
        Ok(data
            .range::<[u8], _>(bounds(start, end))
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn reverse_scan(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<RawKvPair>, StorageError> {
        self.ensure_open()?;
        if is_empty_range(start, end) {
            return Ok(Vec::new());
        }
        let data = self.data.read();
        Ok(data
            .range::<[u8], _>(bounds(start, end))
            .rev()
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn delete_range(&self, start: &[u8], end: &[u8]) -> Result<(), StorageError> {
        self.ensure_open()?;
        if is_empty_range(start, end) {
            return Ok(());
        }
        let mut data = self.data.write();
        let doomed: Vec<Vec<u8>> = data
            .range::<[u8], _>(bounds(start, end))
            .map(|(k, _)| k.clone())
            .collect();
        for key in doomed {
            data.remove(&key);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
