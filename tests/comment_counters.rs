//! The denormalized comment counter on posts is maintained at the store
//! level when comments come and go, mirroring the schema triggers.

mod common;

use uuid::Uuid;

use common::{MemoryStore, make_comment, make_post};
use palaver::application::repos::{CommentsRepo, PostsRepo};

#[tokio::test]
async fn comment_writes_keep_the_post_counter_in_step() {
    let author = Uuid::new_v4();
    let post = make_post(author);
    let post_id = post.id;
    let store = MemoryStore::with_posts(vec![post]);

    let first = make_comment(post_id, Uuid::new_v4());
    let second = make_comment(post_id, Uuid::new_v4());
    let first_id = first.id;
    store.add_comment(first);
    store.add_comment(second);

    let stored = PostsRepo::find_by_id(&store, post_id).await.unwrap().unwrap();
    assert_eq!(stored.comment_count, 2);
    assert_eq!(store.count_for_post(post_id).await.unwrap(), 2);

    store.remove_comment(first_id);
    let stored = PostsRepo::find_by_id(&store, post_id).await.unwrap().unwrap();
    assert_eq!(stored.comment_count, 1);
    assert_eq!(store.count_for_post(post_id).await.unwrap(), 1);
}

#[tokio::test]
async fn removing_an_unknown_comment_leaves_the_counter_alone() {
    let author = Uuid::new_v4();
    let post = make_post(author);
    let post_id = post.id;
    let store = MemoryStore::with_posts(vec![post]);

    store.remove_comment(Uuid::new_v4());

    let stored = PostsRepo::find_by_id(&store, post_id).await.unwrap().unwrap();
    assert_eq!(stored.comment_count, 0);
}
