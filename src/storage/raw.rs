// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Contract of the raw (unversioned) key-value store.

use async_trait::async_trait;

use super::StorageError;

/// A physical key and its stored bytes.
pub type RawKvPair = (Vec<u8>, Vec<u8>);

/// An ordered byte-string store with point writes, range scans and range deletes.
///
/// Ranges are half-open `[start, end)` in byte order. An empty `end` means the
/// range has no upper bound.
///
/// Implementations must be safe to call concurrently from many tasks. They do
/// not see the caller's [`Context`](crate::Context): a call is cancelled by
/// dropping its future.
#[async_trait]
pub trait RawKvClient: Send + Sync + 'static {
    /// Returns a human-readable name of the store.
    fn name(&self) -> &str;

    /// Writes a single key.
    async fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StorageError>;

    /// Writes several keys in one call.
    async fn batch_put(&self, pairs: Vec<RawKvPair>) -> Result<(), StorageError>;

    /// Returns at most `limit` pairs in `[start, end)`, ascending.
    async fn scan(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<RawKvPair>, StorageError>;

    /// Returns at most `limit` pairs in `[start, end)`, descending.
    async fn reverse_scan(
        &self,
        start: &[u8],
        end: &[u8],
        limit: usize,
    ) -> Result<Vec<RawKvPair>, StorageError>;

    /// Removes every key in `[start, end)`.
    async fn delete_range(&self, start: &[u8], end: &[u8]) -> Result<(), StorageError>;

    /// Releases the connection.
    async fn close(&self) -> Result<(), StorageError>;
}
