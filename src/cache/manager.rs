//! TTL cache layered over a key-value store
//!
//! Provides a `TtlCache` that stores successful fetch results together with an
//! absolute expiry timestamp, and serves them without calling the fetcher for
//! as long as they are fresh.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::keys::CacheKey;
use super::store::{KeyValueStore, StoreError};
use crate::clock::{Clock, SystemClock};

/// Record persisted under each cache key
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The cached payload
    data: T,
    /// Epoch milliseconds after which the entry is stale
    expiry: i64,
}

/// Read-through cache with per-call time-to-live
///
/// An entry is served only while `now < expiry`. Stale entries are deleted
/// the first time they are read. Storage failures never fail a read: a
/// broken read is a miss, a broken write just skips caching.
#[derive(Clone)]
pub struct TtlCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    /// Creates a cache over `store` using the system clock
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a cache over `store` with a custom time source
    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the cached value for `key`, or runs `fetcher` and caches its result
    ///
    /// # Arguments
    /// * `key` - Opaque cache key
    /// * `fetcher` - Produces the value on a miss; invoked at most once
    /// * `ttl` - How long a freshly fetched value stays valid
    ///
    /// # Returns
    /// * `Ok(T)` - The live cached value, or the freshly fetched one
    /// * `Err(E)` - The fetcher's error, unchanged
    pub async fn get_cached<T, F, Fut, E>(&self, key: &str, fetcher: F, ttl: Duration) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(data) = self.read(key).await {
            debug!(key, "cache hit");
            return Ok(data);
        }

        debug!(key, "cache miss");
        let data = fetcher().await?;
        self.write(key, &data, ttl).await;
        Ok(data)
    }

    /// Reads a live entry
    ///
    /// Returns `None` when the entry is absent, unreadable or stale. Stale
    /// entries are removed from the store.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "malformed cache entry, treating as miss");
                return None;
            }
        };

        if self.clock.now_millis() < entry.expiry {
            return Some(entry.data);
        }

        debug!(key, expiry = entry.expiry, "cache entry expired");
        if let Err(e) = self.store.delete(key).await {
            warn!(key, error = %e, "failed to delete expired cache entry");
        }
        None
    }

    /// Stores `data` under `key`, fresh for `ttl`
    ///
    /// Write failures are logged and otherwise ignored.
    pub async fn write<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = CacheEntry {
            data,
            expiry: self.clock.now_millis().saturating_add(ttl_millis),
        };

        let result = match serde_json::to_string(&entry) {
            Ok(json) => self.store.set(key, &json).await,
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        };

        if let Err(e) = result {
            warn!(key, error = %e, "cache write failed, continuing without caching");
        }
    }

    /// Drops the entry for `key` so the next read goes to the fetcher
    pub async fn invalidate_key(&self, key: &str) -> Result<(), StoreError> {
        debug!(key, "invalidating cache entry");
        self.store.delete(key).await
    }

    /// Day summary for `date`, cached for 24 hours
    pub async fn get_cached_home_info<F, Fut, E>(&self, date: NaiveDate, fetcher: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        self.get_cached_resource(CacheKey::HomeInfo(date), fetcher).await
    }

    /// Daily reading record for `date`, cached for 24 hours
    pub async fn get_cached_gospel_way<F, Fut, E>(&self, date: NaiveDate, fetcher: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        self.get_cached_resource(CacheKey::GospelWay(date), fetcher).await
    }

    /// Dates with a published reading, cached for 7 days
    pub async fn get_cached_dates<F, Fut, E>(&self, fetcher: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        self.get_cached_resource(CacheKey::AllowedDates, fetcher).await
    }

    async fn get_cached_resource<F, Fut, E>(&self, key: CacheKey, fetcher: F) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        self.get_cached(&key.to_string(), fetcher, key.ttl()).await
    }
}
