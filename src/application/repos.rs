//! Repository traits describing persistence adapters.
//!
//! The core consumes the durable store exclusively through these traits:
//! point/range queries, conditional counter updates, and the per-collection
//! change feed. Implementations live in `infra::db`; tests substitute
//! in-memory fakes.

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::pagination::PaginationError;
use crate::cache::ChangeEvent;
use crate::domain::entities::{
    CommentRecord, CommunityRecord, MembershipRecord, PostRecord, ProfileAggregate, VoteRecord,
};
use crate::domain::types::{Collection, SortOrder, TargetKind, VoteDirection};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("conditional update matched no row")]
    Conflict,
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Errors worth retrying with backoff on write paths that must not lose
    /// the mutation (vote casts).
    pub fn is_transient(&self) -> bool {
        matches!(self, RepoError::Timeout | RepoError::Persistence(_))
    }
}

/// Range-query shape for post listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostQuery {
    pub community_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub created_after: Option<OffsetDateTime>,
    pub sort: SortOrder,
    pub offset: u64,
    pub limit: u32,
}

/// Signed vote-counter deltas committed alongside a ledger mutation.
///
/// Stored counters are floored at zero by the implementation regardless of
/// the sign of the delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterDelta {
    pub upvote: i64,
    pub downvote: i64,
}

/// Target counters as stored after a vote transition committed.
#[derive(Debug, Clone, Copy)]
pub struct TargetCounters {
    pub owner_id: Uuid,
    pub upvote_count: i64,
    pub downvote_count: i64,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_posts(&self, query: &PostQuery) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    async fn list_for_post(
        &self,
        post_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    async fn count_for_post(&self, post_id: Uuid) -> Result<u64, RepoError>;
}

#[derive(Debug, Clone, Copy)]
pub struct NewVote {
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub target_kind: TargetKind,
    pub direction: VoteDirection,
}

/// Vote ledger persistence.
///
/// Every mutation commits the ledger row and the target's counter delta in
/// one transaction, so a crash or a concurrent writer can never observe the
/// vote without its counter effect. The unique index on (user_id, target_id)
/// is the backstop for racing inserts ([`RepoError::Duplicate`]); flips and
/// removals are conditional on the current direction (compare-and-set,
/// [`RepoError::Conflict`] on a lost race).
#[async_trait]
pub trait VotesRepo: Send + Sync {
    async fn find_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<VoteRecord>, RepoError>;

    /// Insert a vote and apply `delta` to the target's counters atomically.
    async fn create_vote(
        &self,
        vote: NewVote,
        delta: CounterDelta,
    ) -> Result<TargetCounters, RepoError>;

    /// Remove a vote (conditional on its current direction) and apply
    /// `delta` atomically.
    async fn remove_vote(
        &self,
        vote_id: Uuid,
        expected: VoteDirection,
        target_id: Uuid,
        target_kind: TargetKind,
        delta: CounterDelta,
    ) -> Result<TargetCounters, RepoError>;

    /// Flip a vote's direction (conditional on its current direction) and
    /// apply `delta` atomically.
    async fn flip_vote(
        &self,
        vote_id: Uuid,
        expected: VoteDirection,
        direction: VoteDirection,
        target_id: Uuid,
        target_kind: TargetKind,
        delta: CounterDelta,
    ) -> Result<TargetCounters, RepoError>;
}

#[async_trait]
pub trait CommunitiesRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommunityRecord>, RepoError>;

    async fn list_members(
        &self,
        community_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<MembershipRecord>, RepoError>;

    async fn count_members(&self, community_id: Uuid) -> Result<u64, RepoError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CommunityRecord>, RepoError>;
}

#[async_trait]
pub trait ProfilesRepo: Send + Sync {
    async fn load_aggregate(&self, user_id: Uuid) -> Result<ProfileAggregate, RepoError>;
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("change stream disconnected: {0}")]
    Disconnected(String),
    #[error("malformed change payload: {0}")]
    Malformed(String),
}

/// Per-collection change feed.
///
/// Delivery is at-least-once; consumers must be idempotent. A stream ending
/// (or yielding `Disconnected`) means the subscriber should resubscribe.
#[async_trait]
pub trait ChangeStream: Send + Sync {
    async fn subscribe(
        &self,
        collection: Collection,
    ) -> Result<BoxStream<'static, Result<ChangeEvent, StreamError>>, StreamError>;
}

/// Best-effort notification sink for vote events.
///
/// Failures are logged by the caller and never roll back the vote.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn vote_received(
        &self,
        owner_id: Uuid,
        target_id: Uuid,
        target_kind: TargetKind,
        direction: VoteDirection,
    ) -> Result<(), RepoError>;
}

/// Default notifier: records the event in the log and does nothing else.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn vote_received(
        &self,
        owner_id: Uuid,
        target_id: Uuid,
        target_kind: TargetKind,
        direction: VoteDirection,
    ) -> Result<(), RepoError> {
        tracing::debug!(
            %owner_id,
            %target_id,
            target_kind = target_kind.as_str(),
            ?direction,
            "vote notification"
        );
        Ok(())
    }
}
