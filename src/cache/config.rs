//! Cache configuration.
//!
//! Controls the in-memory read cache via `palaver.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_CAPACITY: usize = 4096;
const DEFAULT_FEED_TTL_SECS: u64 = 60;
const DEFAULT_PROFILE_TTL_SECS: u64 = 300;
const DEFAULT_ENTITY_TTL_SECS: u64 = 120;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Time-to-live class for a cached value.
///
/// Feed pages churn fastest and get the shortest TTL. Profiles aggregate
/// slow-moving counts and can tolerate longer staleness. Single entities
/// sit in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    Feed,
    Profile,
    Entity,
}

/// Cache configuration from `palaver.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the read-through cache. When disabled every read goes to
    /// the database.
    pub enabled: bool,
    /// Maximum number of entries across all key families.
    pub capacity: usize,
    /// TTL in seconds for feed and listing pages.
    pub feed_ttl_secs: u64,
    /// TTL in seconds for profile aggregates.
    pub profile_ttl_secs: u64,
    /// TTL in seconds for single entities.
    pub entity_ttl_secs: u64,
    /// Interval in seconds between expired-entry sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            feed_ttl_secs: DEFAULT_FEED_TTL_SECS,
            profile_ttl_secs: DEFAULT_PROFILE_TTL_SECS,
            entity_ttl_secs: DEFAULT_ENTITY_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            capacity: settings.capacity,
            feed_ttl_secs: settings.feed_ttl_secs,
            profile_ttl_secs: settings.profile_ttl_secs,
            entity_ttl_secs: settings.entity_ttl_secs,
            sweep_interval_secs: settings.sweep_interval_secs,
        }
    }
}

impl CacheConfig {
    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Resolve a TTL class to a concrete duration.
    pub fn ttl(&self, class: TtlClass) -> Duration {
        let secs = match class {
            TtlClass::Feed => self.feed_ttl_secs,
            TtlClass::Profile => self.profile_ttl_secs,
            TtlClass::Entity => self.entity_ttl_secs,
        };
        Duration::from_secs(secs)
    }

    /// Interval between background sweeps of expired entries.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
