//! Verifies the cache paths emit their metric keys.

use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;
use metrics_util::debugging::DebuggingRecorder;
use palaver::cache::{CacheConfig, CacheStore, keys};
use uuid::Uuid;

#[test]
fn cache_store_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let store = CacheStore::new(&CacheConfig::default());
    let post_id = Uuid::new_v4();

    // Miss, then hit, then a pattern invalidation.
    assert!(store.get(&keys::post(post_id)).is_none());
    store.set(
        keys::post(post_id),
        Bytes::from_static(b"{}"),
        Duration::from_secs(60),
    );
    assert!(store.get(&keys::post(post_id)).is_some());
    assert_eq!(store.delete_by_pattern(&keys::post_pattern(post_id)), 1);

    let seen: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, _)| key.key().name().to_string())
        .collect();

    for name in [
        "palaver_cache_hits_total",
        "palaver_cache_misses_total",
        "palaver_cache_invalidations_total",
    ] {
        assert!(seen.contains(name), "missing metric `{name}` in {seen:?}");
    }
}
