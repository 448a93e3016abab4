//! Cache module for keeping content available offline
//!
//! This module provides a TTL cache that persists fetch results through a
//! pluggable key-value store. Each entry carries an absolute expiry timestamp;
//! entries are served only while fresh and are dropped lazily once stale.

mod keys;
mod manager;
mod store;

pub use keys::{CacheKey, TTL_DAILY, TTL_DATES};
pub use manager::TtlCache;
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
