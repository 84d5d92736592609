//! Change-capture router.
//!
//! Runs one task per tracked collection. Each task subscribes to the
//! collection's change stream, translates every event through the
//! invalidation table, and drops the matching cache entries. A broken
//! stream is resubscribed with exponential backoff; a malformed event is
//! logged and skipped so one bad payload never stalls the stream.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use metrics::counter;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::repos::ChangeStream;
use crate::domain::types::Collection;

use super::events::ChangeEvent;
use super::invalidation::invalidation_patterns;
use super::store::CacheStore;

const METRIC_CAPTURE_EVENTS: &str = "palaver_capture_events_total";
const METRIC_CAPTURE_RESUBSCRIBES: &str = "palaver_capture_resubscribes_total";

const DEFAULT_INITIAL_BACKOFF_MS: u64 = 200;
const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;

/// Change-capture configuration from `palaver.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Collections to watch. Deployments can narrow this to the subset
    /// their traffic touches.
    pub collections: Vec<Collection>,
    /// First resubscribe delay after a stream failure.
    pub initial_backoff_ms: u64,
    /// Upper bound for the resubscribe delay.
    pub max_backoff_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            collections: Collection::ALL.to_vec(),
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl From<&crate::config::CaptureSettings> for CaptureConfig {
    fn from(settings: &crate::config::CaptureSettings) -> Self {
        Self {
            collections: settings.collections.clone(),
            initial_backoff_ms: settings.initial_backoff_ms,
            max_backoff_ms: settings.max_backoff_ms,
        }
    }
}

/// Routes change events to cache invalidations.
pub struct ChangeCaptureRouter {
    config: CaptureConfig,
    store: Arc<CacheStore>,
    stream: Arc<dyn ChangeStream>,
}

impl ChangeCaptureRouter {
    pub fn new(config: CaptureConfig, store: Arc<CacheStore>, stream: Arc<dyn ChangeStream>) -> Self {
        Self {
            config,
            store,
            stream,
        }
    }

    /// Spawn one capture task per configured collection.
    pub fn spawn(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        self.config
            .collections
            .clone()
            .into_iter()
            .map(|collection| {
                let router = self.clone();
                tokio::spawn(async move { router.run_collection(collection).await })
            })
            .collect()
    }

    /// Subscribe-and-drain loop for one collection. Never returns; every
    /// failure path falls through to a backed-off resubscribe.
    async fn run_collection(&self, collection: Collection) {
        let mut backoff = Duration::from_millis(self.config.initial_backoff_ms);
        let max_backoff = Duration::from_millis(self.config.max_backoff_ms);

        loop {
            match self.stream.subscribe(collection).await {
                Ok(mut events) => {
                    info!(collection = collection.as_str(), "Change stream subscribed");

                    while let Some(item) = events.next().await {
                        match item {
                            Ok(event) => {
                                self.apply(&event);
                                // A delivered event proves the stream is
                                // healthy; a subscription that dies before
                                // yielding anything keeps escalating.
                                backoff = Duration::from_millis(self.config.initial_backoff_ms);
                            }
                            Err(error) => {
                                warn!(
                                    collection = collection.as_str(),
                                    %error,
                                    "Skipping undecodable change event"
                                );
                            }
                        }
                    }

                    warn!(
                        collection = collection.as_str(),
                        "Change stream ended, resubscribing"
                    );
                }
                Err(error) => {
                    warn!(
                        collection = collection.as_str(),
                        %error,
                        "Change stream subscription failed"
                    );
                }
            }

            counter!(METRIC_CAPTURE_RESUBSCRIBES, "collection" => collection.as_str())
                .increment(1);
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(max_backoff);
        }
    }

    /// Apply one change event to the cache.
    pub fn apply(&self, event: &ChangeEvent) {
        let patterns = invalidation_patterns(event);
        let mut dropped = 0;
        for pattern in &patterns {
            dropped += self.store.delete_by_pattern(pattern);
        }

        counter!(METRIC_CAPTURE_EVENTS, "collection" => event.collection.as_str())
            .increment(1);
        info!(
            collection = event.collection.as_str(),
            operation = ?event.operation,
            document_id = %event.document_id,
            patterns = patterns.len(),
            dropped,
            "Change event applied"
        );
    }
}

/// Periodically reclaim expired entries so idle key families do not pin
/// memory until their next read.
pub fn spawn_sweeper(store: Arc<CacheStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Swept expired cache entries");
            }
        }
    })
}
