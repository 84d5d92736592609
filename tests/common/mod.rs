//! In-memory repository fakes shared by the integration tests.
//!
//! `MemoryStore` mirrors the database semantics the services lean on: a
//! unique (user, target) vote pair, compare-and-set direction updates, vote
//! transitions that commit the ledger row and the counter delta under one
//! lock, and comment counters maintained on comment insert/delete the way
//! the schema triggers do.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use palaver::application::repos::{
    CommentsRepo, CounterDelta, NewVote, Notifier, PostQuery, PostsRepo, RepoError,
    TargetCounters, VotesRepo,
};
use palaver::domain::entities::{CommentRecord, PostRecord, VoteRecord};
use palaver::domain::types::{TargetKind, VoteDirection};

pub fn make_post(author_id: Uuid) -> PostRecord {
    let now = OffsetDateTime::now_utc();
    PostRecord {
        id: Uuid::new_v4(),
        author_id,
        community_id: None,
        title: "An observation".to_string(),
        body: "Worth discussing.".to_string(),
        upvote_count: 0,
        downvote_count: 0,
        comment_count: 0,
        created_at: now,
        updated_at: now,
    }
}

pub fn make_comment(post_id: Uuid, author_id: Uuid) -> CommentRecord {
    CommentRecord {
        id: Uuid::new_v4(),
        post_id,
        author_id,
        body: "A reply.".to_string(),
        upvote_count: 0,
        downvote_count: 0,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[derive(Default)]
struct Tables {
    posts: HashMap<Uuid, PostRecord>,
    comments: HashMap<Uuid, CommentRecord>,
    votes: HashMap<Uuid, VoteRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn with_posts(posts: Vec<PostRecord>) -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock().unwrap();
            tables.posts = posts.into_iter().map(|p| (p.id, p)).collect();
        }
        store
    }

    pub fn get_post(&self, id: Uuid) -> Option<PostRecord> {
        self.tables.lock().unwrap().posts.get(&id).cloned()
    }

    pub fn vote_count(&self) -> usize {
        self.tables.lock().unwrap().votes.len()
    }

    /// Inserts a comment and bumps the parent post's comment counter, as the
    /// comments trigger does in the schema.
    pub fn add_comment(&self, comment: CommentRecord) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(post) = tables.posts.get_mut(&comment.post_id) {
            post.comment_count += 1;
            post.updated_at = OffsetDateTime::now_utc();
        }
        tables.comments.insert(comment.id, comment);
    }

    /// Deletes a comment and decrements the parent post's comment counter,
    /// flooring at zero.
    pub fn remove_comment(&self, comment_id: Uuid) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(comment) = tables.comments.remove(&comment_id)
            && let Some(post) = tables.posts.get_mut(&comment.post_id)
        {
            post.comment_count = (post.comment_count - 1).max(0);
            post.updated_at = OffsetDateTime::now_utc();
        }
    }

    fn apply_target_delta(
        tables: &mut Tables,
        target_id: Uuid,
        target_kind: TargetKind,
        delta: CounterDelta,
    ) -> Result<TargetCounters, RepoError> {
        match target_kind {
            TargetKind::Post => {
                let post = tables.posts.get_mut(&target_id).ok_or(RepoError::NotFound)?;
                post.upvote_count = (post.upvote_count + delta.upvote).max(0);
                post.downvote_count = (post.downvote_count + delta.downvote).max(0);
                post.updated_at = OffsetDateTime::now_utc();
                Ok(TargetCounters {
                    owner_id: post.author_id,
                    upvote_count: post.upvote_count,
                    downvote_count: post.downvote_count,
                })
            }
            TargetKind::Comment => {
                let comment = tables
                    .comments
                    .get_mut(&target_id)
                    .ok_or(RepoError::NotFound)?;
                comment.upvote_count = (comment.upvote_count + delta.upvote).max(0);
                comment.downvote_count = (comment.downvote_count + delta.downvote).max(0);
                Ok(TargetCounters {
                    owner_id: comment.author_id,
                    upvote_count: comment.upvote_count,
                    downvote_count: comment.downvote_count,
                })
            }
        }
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.tables.lock().unwrap().posts.get(&id).cloned())
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        let mut posts: Vec<PostRecord> = tables
            .posts
            .values()
            .filter(|p| query.community_id.is_none_or(|c| p.community_id == Some(c)))
            .filter(|p| query.created_after.is_none_or(|t| p.created_at >= t))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn count_posts(&self, query: &PostQuery) -> Result<u64, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .posts
            .values()
            .filter(|p| query.community_id.is_none_or(|c| p.community_id == Some(c)))
            .filter(|p| query.created_after.is_none_or(|t| p.created_at >= t))
            .count() as u64)
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self.tables.lock().unwrap().comments.get(&id).cloned())
    }

    async fn list_for_post(
        &self,
        post_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        let mut comments: Vec<CommentRecord> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_for_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .count() as u64)
    }
}

#[async_trait]
impl VotesRepo for MemoryStore {
    async fn find_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<VoteRecord>, RepoError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .votes
            .values()
            .find(|v| v.user_id == user_id && v.target_id == target_id)
            .cloned())
    }

    async fn create_vote(
        &self,
        vote: NewVote,
        delta: CounterDelta,
    ) -> Result<TargetCounters, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        let exists = tables
            .votes
            .values()
            .any(|v| v.user_id == vote.user_id && v.target_id == vote.target_id);
        if exists {
            return Err(RepoError::Duplicate {
                constraint: "votes_user_target_key".to_string(),
            });
        }
        let counters =
            Self::apply_target_delta(&mut tables, vote.target_id, vote.target_kind, delta)?;
        let record = VoteRecord {
            id: Uuid::new_v4(),
            user_id: vote.user_id,
            target_id: vote.target_id,
            target_kind: vote.target_kind,
            direction: vote.direction,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.votes.insert(record.id, record);
        Ok(counters)
    }

    async fn remove_vote(
        &self,
        vote_id: Uuid,
        expected: VoteDirection,
        target_id: Uuid,
        target_kind: TargetKind,
        delta: CounterDelta,
    ) -> Result<TargetCounters, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.votes.get(&vote_id) {
            Some(vote) if vote.direction == expected => {
                tables.votes.remove(&vote_id);
            }
            _ => return Err(RepoError::Conflict),
        }
        Self::apply_target_delta(&mut tables, target_id, target_kind, delta)
    }

    async fn flip_vote(
        &self,
        vote_id: Uuid,
        expected: VoteDirection,
        direction: VoteDirection,
        target_id: Uuid,
        target_kind: TargetKind,
        delta: CounterDelta,
    ) -> Result<TargetCounters, RepoError> {
        let mut tables = self.tables.lock().unwrap();
        match tables.votes.get_mut(&vote_id) {
            Some(vote) if vote.direction == expected => {
                vote.direction = direction;
            }
            _ => return Err(RepoError::Conflict),
        }
        Self::apply_target_delta(&mut tables, target_id, target_kind, delta)
    }
}

/// Notifier fake that records the deliveries it saw.
#[derive(Default)]
pub struct RecordingNotifier {
    pub deliveries: Mutex<Vec<(Uuid, Uuid, VoteDirection)>>,
}

impl RecordingNotifier {
    pub fn delivered(&self) -> Vec<(Uuid, Uuid, VoteDirection)> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn vote_received(
        &self,
        owner_id: Uuid,
        target_id: Uuid,
        _target_kind: TargetKind,
        direction: VoteDirection,
    ) -> Result<(), RepoError> {
        self.deliveries
            .lock()
            .unwrap()
            .push((owner_id, target_id, direction));
        Ok(())
    }
}
