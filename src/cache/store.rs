//! In-memory cache storage.
//!
//! A single LRU-bounded map from string keys to serialized values with
//! per-entry expiry. Wildcard deletes walk the map, which keeps
//! invalidation idempotent: deleting keys that are not present is a no-op.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

const METRIC_CACHE_HITS: &str = "palaver_cache_hits_total";
const METRIC_CACHE_MISSES: &str = "palaver_cache_misses_total";
const METRIC_CACHE_INVALIDATIONS: &str = "palaver_cache_invalidations_total";

/// A cached value with its expiry deadline.
#[derive(Clone)]
struct CacheEntry {
    body: Bytes,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Bounded key-value store backing the read-through cache.
///
/// Values are stored as serialized bytes so the store stays agnostic of
/// what it caches. Expired entries are treated as absent on read and
/// reclaimed either lazily on access or by the periodic sweep.
pub struct CacheStore {
    entries: RwLock<LruCache<String, CacheEntry>>,
}

impl CacheStore {
    /// Create a new store with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    /// Look up a key, treating expired entries as absent.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                counter!(METRIC_CACHE_HITS).increment(1);
                Some(entry.body.clone())
            }
            Some(_) => {
                entries.pop(key);
                counter!(METRIC_CACHE_MISSES).increment(1);
                None
            }
            None => {
                counter!(METRIC_CACHE_MISSES).increment(1);
                None
            }
        }
    }

    /// Store a value under a key with the given time-to-live.
    pub fn set(&self, key: String, body: Bytes, ttl: Duration) {
        let entry = CacheEntry {
            body,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.entries, SOURCE, "set").put(key, entry);
    }

    /// Delete a single key. Missing keys are a no-op.
    pub fn delete(&self, key: &str) {
        if rw_write(&self.entries, SOURCE, "delete").pop(key).is_some() {
            counter!(METRIC_CACHE_INVALIDATIONS).increment(1);
        }
    }

    /// Delete every key matching the pattern.
    ///
    /// Returns the number of entries removed. Repeating the same pattern
    /// immediately afterwards removes nothing.
    pub fn delete_by_pattern(&self, pattern: &str) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "delete_by_pattern");
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| pattern_matches(pattern, key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            entries.pop(key);
        }
        if !matching.is_empty() {
            counter!(METRIC_CACHE_INVALIDATIONS).increment(matching.len() as u64);
        }
        matching.len()
    }

    /// Drop entries past their expiry deadline.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "purge_expired");
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    /// Number of resident entries, expired ones included.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }
}

/// Match a colon-segmented key against a pattern.
///
/// Each pattern segment must equal the corresponding key segment, except
/// a trailing `*` which matches one or more remaining segments. A `*` in
/// a non-trailing position matches exactly one segment.
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let mut pattern_segments = pattern.split(':').peekable();
    let mut key_segments = key.split(':');

    loop {
        match (pattern_segments.next(), key_segments.next()) {
            (None, None) => return true,
            (None, Some(_)) | (Some(_), None) => return false,
            (Some("*"), Some(_)) => {
                if pattern_segments.peek().is_none() {
                    // Trailing wildcard swallows the rest of the key.
                    return true;
                }
            }
            (Some(p), Some(k)) => {
                if p != k {
                    return false;
                }
            }
        }
    }
}
