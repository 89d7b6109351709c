// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Configuration for the versioned store.

use super::{MAX_KEY_SIZE, MAX_VALUE_SIZE};

/// Default number of keys handled by one concurrent batch-delete task.
pub const DEFAULT_SHARD_SIZE: usize = 100;

/// Default number of physical entries fetched per raw scan page.
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 256;

/// Configuration for [`VersionedStore`](super::VersionedStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Keys per shard in `batch_delete_concurrent`.
    pub batch_delete_shard_size: usize,
    /// Physical entries requested per raw scan call in `scan` / `reverse_scan`.
    pub scan_batch_size: usize,
    /// Largest accepted user key, in bytes.
    pub max_key_size: usize,
    /// Largest accepted value, in bytes.
    pub max_value_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            batch_delete_shard_size: DEFAULT_SHARD_SIZE,
            scan_batch_size: DEFAULT_SCAN_BATCH_SIZE,
            max_key_size: MAX_KEY_SIZE,
            max_value_size: MAX_VALUE_SIZE,
        }
    }
}

impl StoreConfig {
    /// Sets the shard size for concurrent batch deletes. Zero is treated as one.
    pub fn with_shard_size(mut self, shard_size: usize) -> Self {
        self.batch_delete_shard_size = shard_size.max(1);
        self
    }

    /// Sets the raw scan page size. Zero is treated as one.
    pub fn with_scan_batch_size(mut self, batch_size: usize) -> Self {
        self.scan_batch_size = batch_size.max(1);
        self
    }

    /// Sets the maximum key size.
    pub fn with_max_key_size(mut self, size: usize) -> Self {
        self.max_key_size = size;
        self
    }

    /// Sets the maximum value size.
    pub fn with_max_value_size(mut self, size: usize) -> Self {
        self.max_value_size = size;
        self
    }
}
