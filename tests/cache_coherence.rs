//! Cache coherence over the store, facade, and change-capture router.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use uuid::Uuid;

use palaver::application::repos::RepoError;
use palaver::cache::{
    CacheConfig, CacheStore, CaptureConfig, ChangeCaptureRouter, ChangeEvent, ChangedRefs,
    ReadThroughCache, TtlClass, keys,
};
use palaver::domain::types::{ChangeOperation, Collection, SortOrder};

fn store() -> Arc<CacheStore> {
    Arc::new(CacheStore::new(&CacheConfig::default()))
}

fn router(store: Arc<CacheStore>) -> ChangeCaptureRouter {
    struct NeverStream;

    #[async_trait::async_trait]
    impl palaver::application::repos::ChangeStream for NeverStream {
        async fn subscribe(
            &self,
            _collection: Collection,
        ) -> Result<
            futures::stream::BoxStream<
                'static,
                Result<ChangeEvent, palaver::application::repos::StreamError>,
            >,
            palaver::application::repos::StreamError,
        > {
            Ok(Box::pin(futures::stream::pending()))
        }
    }

    ChangeCaptureRouter::new(CaptureConfig::default(), store, Arc::new(NeverStream))
}

fn post_event(post_id: Uuid, community_id: Option<Uuid>, author_id: Uuid) -> ChangeEvent {
    ChangeEvent {
        collection: Collection::Posts,
        operation: ChangeOperation::Update,
        document_id: post_id,
        refs: ChangedRefs {
            community_id,
            post_id: None,
            user_id: Some(author_id),
        },
    }
}

#[tokio::test]
async fn post_change_evicts_feed_pages_and_the_post() {
    let store = store();
    let post_id = Uuid::new_v4();
    let other_post = Uuid::new_v4();
    let ttl = Duration::from_secs(60);

    store.set(
        keys::feed_page(SortOrder::New, 1, 20),
        Bytes::from_static(b"[]"),
        ttl,
    );
    store.set(keys::post(post_id), Bytes::from_static(b"{}"), ttl);
    store.set(keys::post(other_post), Bytes::from_static(b"{}"), ttl);

    let router = router(store.clone());
    router.apply(&post_event(post_id, None, Uuid::new_v4()));

    assert!(store.get(&keys::feed_page(SortOrder::New, 1, 20)).is_none());
    assert!(store.get(&keys::post(post_id)).is_none());
    // Unrelated entity entries survive.
    assert!(store.get(&keys::post(other_post)).is_some());
}

#[tokio::test]
async fn community_scoped_invalidation_spares_other_communities() {
    let store = store();
    let community = Uuid::new_v4();
    let other_community = Uuid::new_v4();
    let post_id = Uuid::new_v4();
    let ttl = Duration::from_secs(60);

    store.set(
        keys::community_posts(community, SortOrder::New, 1, 20),
        Bytes::from_static(b"[]"),
        ttl,
    );
    store.set(
        keys::community_posts(other_community, SortOrder::New, 1, 20),
        Bytes::from_static(b"[]"),
        ttl,
    );

    let router = router(store.clone());
    router.apply(&post_event(post_id, Some(community), Uuid::new_v4()));

    assert!(
        store
            .get(&keys::community_posts(community, SortOrder::New, 1, 20))
            .is_none()
    );
    assert!(
        store
            .get(&keys::community_posts(other_community, SortOrder::New, 1, 20))
            .is_some()
    );
}

#[tokio::test]
async fn applying_the_same_event_twice_is_idempotent() {
    let store = store();
    let post_id = Uuid::new_v4();
    store.set(
        keys::post(post_id),
        Bytes::from_static(b"{}"),
        Duration::from_secs(60),
    );

    let router = router(store.clone());
    let event = post_event(post_id, None, Uuid::new_v4());
    router.apply(&event);
    let len_after_first = store.len();
    router.apply(&event);

    assert_eq!(store.len(), len_after_first);
    assert!(store.get(&keys::post(post_id)).is_none());
}

#[tokio::test]
async fn read_recomputes_after_invalidation() {
    let config = CacheConfig::default();
    let store = Arc::new(CacheStore::new(&config));
    let cache = ReadThroughCache::new(config, store.clone());
    let post_id = Uuid::new_v4();
    let computes = AtomicUsize::new(0);

    let fetch = |value: &'static str| {
        let computes = &computes;
        async move {
            computes.fetch_add(1, Ordering::SeqCst);
            Ok::<_, RepoError>(value.to_string())
        }
    };

    let first = cache
        .get_or_compute(keys::post(post_id), TtlClass::Entity, || fetch("v1"))
        .await
        .unwrap();
    assert_eq!(first, "v1");

    // Served from cache; the stale closure value proves it.
    let second = cache
        .get_or_compute(keys::post(post_id), TtlClass::Entity, || fetch("v2"))
        .await
        .unwrap();
    assert_eq!(second, "v1");
    assert_eq!(computes.load(Ordering::SeqCst), 1);

    let router = router(store.clone());
    router.apply(&post_event(post_id, None, Uuid::new_v4()));

    let third = cache
        .get_or_compute(keys::post(post_id), TtlClass::Entity, || fetch("v3"))
        .await
        .unwrap();
    assert_eq!(third, "v3");
    assert_eq!(computes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn membership_change_narrows_to_the_member_and_community() {
    let store = store();
    let community = Uuid::new_v4();
    let member = Uuid::new_v4();
    let bystander = Uuid::new_v4();
    let ttl = Duration::from_secs(60);

    store.set(
        keys::community_members(community, 1, 20),
        Bytes::from_static(b"[]"),
        ttl,
    );
    store.set(
        keys::user_communities(member),
        Bytes::from_static(b"[]"),
        ttl,
    );
    store.set(
        keys::user_communities(bystander),
        Bytes::from_static(b"[]"),
        ttl,
    );

    let router = router(store.clone());
    router.apply(&ChangeEvent {
        collection: Collection::Memberships,
        operation: ChangeOperation::Insert,
        document_id: member,
        refs: ChangedRefs {
            community_id: Some(community),
            post_id: None,
            user_id: Some(member),
        },
    });

    assert!(store.get(&keys::community_members(community, 1, 20)).is_none());
    assert!(store.get(&keys::user_communities(member)).is_none());
    assert!(store.get(&keys::user_communities(bystander)).is_some());
}
