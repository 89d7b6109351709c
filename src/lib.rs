// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! versionkv: point-in-time versioned key-value access over a raw ordered store
//!
//! The underlying store offers point writes, range scans and range deletes on
//! flat byte strings, with no notion of versions. This crate layers
//! "value of key K as of timestamp T" reads, history deletion and
//! shard-parallel batch deletion on top of it.

pub mod context;
pub mod storage;

pub use context::Context;
pub use storage::{
    DurabilityMode, Key, MemoryRawKv, MvccStore, RawKvClient, RocksRawKv, StorageError,
    StoreConfig, Timestamp, Value, VersionedStore, MAX_TIMESTAMP,
};
