// Copyright 2025 Ojima Abraham
// SPDX-License-Identifier: Apache-2.0

//! Multi-version storage over a raw, unversioned key-value store.
//!
//! The raw store only knows flat byte-string keys. This module encodes each
//! `(user key, timestamp)` pair into one physical key so that point-in-time
//! reads and history deletes become bounded range operations.
//!
//! # Key Concepts
//!
//! - **Snapshot read**: `get(key, ts)` returns the newest version whose
//!   timestamp is `<= ts`, or `None`.
//! - **History delete**: `delete(key, ts)` removes every version `<= ts` in a
//!   single range delete. Newer versions survive.
//! - **Concurrent batch delete**: keys are split into fixed-size shards, one
//!   task per shard; the first failure is returned and cancels keys that have
//!   not been issued yet.
//!
//! # Example
//!
//! ```no_run
//! use versionkv::storage::{Key, MvccStore, StoreConfig, Value, VersionedStore};
//! use versionkv::Context;
//!
//! # async fn demo() -> Result<(), versionkv::StorageError> {
//! let store = VersionedStore::in_memory(StoreConfig::default());
//! let ctx = Context::background();
//!
//! store.set(&ctx, &Key::from("milvus"), Value::from("v1"), 1).await?;
//! store.set(&ctx, &Key::from("milvus"), Value::from("v2"), 2).await?;
//!
//! assert_eq!(store.get(&ctx, &Key::from("milvus"), 0).await?, None);
//! assert_eq!(store.get(&ctx, &Key::from("milvus"), 5).await?, Some(Value::from("v2")));
//!
//! store.delete(&ctx, &Key::from("milvus"), 2).await?;
//! assert_eq!(store.get(&ctx, &Key::from("milvus"), 5).await?, None);
//!
//! store.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod key;
mod memory;
mod mvcc;
mod raw;
mod rocks;
mod store;

pub use config::{StoreConfig, DEFAULT_SCAN_BATCH_SIZE, DEFAULT_SHARD_SIZE};
pub use error::StorageError;
pub use key::{decode_mvcc_key, encode_mvcc_key, key_boundary, user_key_prefix};
pub use memory::MemoryRawKv;
pub use mvcc::{Key, MvccStore, Timestamp, Value, MAX_KEY_SIZE, MAX_TIMESTAMP, MAX_VALUE_SIZE};
pub use raw::{RawKvClient, RawKvPair};
pub use rocks::{DurabilityMode, RocksRawKv};
pub use store::VersionedStore;
