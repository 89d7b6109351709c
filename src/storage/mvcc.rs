// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! MVCC types and trait definitions.

use async_trait::async_trait;

use crate::context::Context;

use super::error::StorageError;

/// Maximum key size in bytes.
pub const MAX_KEY_SIZE: usize = 8 * 1024; // 8KB

/// Maximum value size in bytes.
pub const MAX_VALUE_SIZE: usize = 64 * 1024 * 1024; // 64MB

/// Caller-assigned logical version. Higher is newer.
pub type Timestamp = u64;

/// Sentinel meaning "the newest version" on reads and "every version" on deletes.
pub const MAX_TIMESTAMP: Timestamp = u64::MAX;

/// A key in the MVCC store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(pub Vec<u8>);

impl Key {
    /// Creates a new key from bytes.
    #[inline]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the key.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the key is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for Key {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Key {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A value in the MVCC store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value(pub Vec<u8>);

impl Value {
    /// Creates a new value from bytes.
    #[inline]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the value bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the value and returns its bytes.
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the length of the value.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the value is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The versioned key-value store trait.
///
/// Every version of a key is an immutable cell addressed by `(key, timestamp)`.
/// Reads at timestamp `ts` see the newest version whose timestamp is `<= ts`.
/// Deletes remove history: every version `<= ts` of a key at once.
///
/// All operations take a [`Context`] and fail with `Cancelled` or
/// `DeadlineExceeded` when it fires before the underlying store answers.
#[async_trait]
pub trait MvccStore: Send + Sync {
    /// Returns a human-readable name of the backing store.
    fn name(&self) -> &str;

    /// Reads the newest version of `key` at or before `ts`.
    ///
    /// Returns `Ok(None)` when no such version exists.
    async fn get(&self, ctx: &Context, key: &Key, ts: Timestamp)
        -> Result<Option<Value>, StorageError>;

    /// Writes the version of `key` at `ts`, replacing that exact version if present.
    async fn set(
        &self,
        ctx: &Context,
        key: &Key,
        value: Value,
        ts: Timestamp,
    ) -> Result<(), StorageError>;

    /// Reads several keys at the same timestamp.
    ///
    /// The result is positional: entry `i` answers `keys[i]`. The first
    /// failure aborts the whole call.
    async fn batch_get(
        &self,
        ctx: &Context,
        keys: &[Key],
        ts: Timestamp,
    ) -> Result<Vec<Option<Value>>, StorageError>;

    /// Writes `values[i]` as the version of `keys[i]` at `ts`, in one store call.
    async fn batch_set(
        &self,
        ctx: &Context,
        keys: &[Key],
        values: Vec<Value>,
        ts: Timestamp,
    ) -> Result<(), StorageError>;

    /// Removes every version of `key` with timestamp `<= ts`.
    async fn delete(&self, ctx: &Context, key: &Key, ts: Timestamp) -> Result<(), StorageError>;

    /// Deletes the history of each key one after another, stopping at the first failure.
    async fn batch_delete(
        &self,
        ctx: &Context,
        keys: &[Key],
        ts: Timestamp,
    ) -> Result<(), StorageError>;

    /// Deletes the history of each key with one concurrent task per shard.
    ///
    /// Returns the first error observed. Deletions that already succeeded in
    /// other shards are not rolled back.
    async fn batch_delete_concurrent(
        &self,
        ctx: &Context,
        keys: &[Key],
        ts: Timestamp,
    ) -> Result<(), StorageError>;

    /// Scans user keys in `[start, end)` ascending, each with its newest
    /// version at or before `ts`. An empty `end` means no upper bound.
    async fn scan(
        &self,
        ctx: &Context,
        start: &Key,
        end: &Key,
        limit: usize,
        ts: Timestamp,
    ) -> Result<Vec<(Key, Value)>, StorageError>;

    /// Same as [`MvccStore::scan`] in descending key order.
    async fn reverse_scan(
        &self,
        ctx: &Context,
        start: &Key,
        end: &Key,
        limit: usize,
        ts: Timestamp,
    ) -> Result<Vec<(Key, Value)>, StorageError>;

    /// Releases the underlying store. Later calls fail with `Closed`.
    async fn close(&self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_from_bytes() {
        let key = Key::from(b"hello".as_slice());
        assert_eq!(key.as_bytes(), b"hello");
        assert_eq!(key.len(), 5);
    }

    #[test]
    fn test_key_from_str() {
        let key = Key::from("hello");
        assert_eq!(key.as_bytes(), b"hello");
    }

    #[test]
    fn test_key_ordering_is_bytewise() {
        assert!(Key::from("a") < Key::from("ab"));
        assert!(Key::from("ab") < Key::from("b"));
    }

    #[test]
    fn test_value_from_bytes() {
        let value = Value::from(b"world".as_slice());
        assert_eq!(value.as_bytes(), b"world");
        assert_eq!(value.len(), 5);
        assert_eq!(value.into_bytes(), b"world".to_vec());
    }
}
