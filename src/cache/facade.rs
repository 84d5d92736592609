//! Read-through cache facade.
//!
//! Wraps the store with serialize-on-write, deserialize-on-read, and a
//! per-key single-flight guard so concurrent misses on the same key run
//! one computation instead of a stampede. Cache failures never surface
//! to callers: a value that cannot be decoded is dropped and recomputed,
//! and a value that cannot be encoded is returned uncached.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::warn;

use super::config::{CacheConfig, TtlClass};
use super::store::CacheStore;

const METRIC_SINGLEFLIGHT_WAITS: &str = "palaver_cache_singleflight_waits_total";

/// Read-through cache over the shared store.
pub struct ReadThroughCache {
    config: CacheConfig,
    store: Arc<CacheStore>,
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl ReadThroughCache {
    pub fn new(config: CacheConfig, store: Arc<CacheStore>) -> Self {
        Self {
            config,
            store,
            inflight: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Fetch a value through the cache, computing it on miss.
    ///
    /// Errors from `compute` pass through unchanged and nothing is cached
    /// for them. With caching disabled this degrades to calling `compute`
    /// directly.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: String,
        class: TtlClass,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        if let Some(value) = self.read(&key) {
            return Ok(value);
        }

        // Single flight: first caller computes, the rest wait then re-read.
        let gate = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = gate.lock().await;

        if let Some(value) = self.read(&key) {
            counter!(METRIC_SINGLEFLIGHT_WAITS).increment(1);
            self.inflight.remove(&key);
            return Ok(value);
        }

        let result = compute().await;
        if let Ok(value) = &result {
            self.write(&key, value, class);
        }
        self.inflight.remove(&key);
        result
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let body = self.store.get(key)?;
        match serde_json::from_slice(&body) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key, %error, "Dropping undecodable cache entry");
                self.store.delete(key);
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T, class: TtlClass) {
        match serde_json::to_vec(value) {
            Ok(body) => {
                self.store
                    .set(key.to_string(), Bytes::from(body), self.config.ttl(class));
            }
            Err(error) => {
                warn!(key, %error, "Skipping cache write for unencodable value");
            }
        }
    }
}
