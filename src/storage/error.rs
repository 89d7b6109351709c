// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Storage error types.

/// Errors that can occur in storage operations.
///
/// A missing version is not an error: reads report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("key too large: {size} > {max}")]
    KeyTooLarge { size: usize, max: usize },

    #[error("value too large: {size} > {max}")]
    ValueTooLarge { size: usize, max: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Failure reported by the raw key-value store, passed through as-is.
    #[error("raw store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("store is closed")]
    Closed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Wraps a raw store failure, keeping it as the error source.
    pub fn backend(e: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StorageError::Backend(e.into())
    }

    /// Returns true for errors caused by context cancellation or timeout.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StorageError::Cancelled | StorageError::DeadlineExceeded)
    }
}
