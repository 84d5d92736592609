//! Vote ledger service.
//!
//! Serializes vote casts per (user, target) pair, plans the state machine
//! transition, and applies it. Each transition commits the ledger mutation
//! and the target's counter delta in a single repository transaction, so the
//! counters can never drift from the ledger. The database unique index and
//! compare-and-set updates are the backstop for races the in-process lock
//! cannot see (multiple instances); a lost race re-reads and replans.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::{counter, histogram};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::repos::{
    CommentsRepo, CounterDelta, NewVote, Notifier, PostsRepo, RepoError, VotesRepo,
};
use crate::domain::types::{TargetKind, VoteDirection};
use crate::domain::votes::{VoteAction, VoteState, plan_transition};

const METRIC_VOTE_CAST_MS: &str = "palaver_vote_cast_ms";
const METRIC_VOTE_RETRIES: &str = "palaver_vote_retries_total";

/// Replans after a lost ledger race before giving up.
const MAX_CAST_ATTEMPTS: u32 = 5;

/// Backoff base for transient transition failures.
const TRANSIENT_RETRY_BASE: Duration = Duration::from_millis(50);

/// Outcome of a vote cast returned to the caller.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoteReceipt {
    pub target_id: Uuid,
    pub target_kind: TargetKind,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub is_upvoted: bool,
    pub is_downvoted: bool,
}

/// Coordinates vote casts against the ledger and counter stores.
pub struct VoteLedger {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    votes: Arc<dyn VotesRepo>,
    notifier: Arc<dyn Notifier>,
    pair_locks: DashMap<(Uuid, Uuid), Arc<Mutex<()>>>,
}

impl VoteLedger {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        votes: Arc<dyn VotesRepo>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            posts,
            comments,
            votes,
            notifier,
            pair_locks: DashMap::new(),
        }
    }

    /// Cast a vote, toggling or flipping as the state machine dictates.
    #[instrument(skip(self), fields(%user_id, %target_id))]
    pub async fn cast_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        target_kind: TargetKind,
        direction: VoteDirection,
    ) -> Result<VoteReceipt, AppError> {
        let started_at = Instant::now();

        // Reject casts on targets that do not exist before touching the
        // ledger.
        self.ensure_target_exists(target_id, target_kind).await?;

        let pair = (user_id, target_id);
        let gate = self
            .pair_locks
            .entry(pair)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = gate.lock().await;

        let result = self
            .cast_locked(user_id, target_id, target_kind, direction)
            .await;

        drop(guard);
        // Drop the map entry only when nobody else holds a clone of the
        // gate, otherwise a late arrival would mint a second mutex for the
        // same pair while a waiter still queues on the first.
        self.pair_locks
            .remove_if(&pair, |_, gate| Arc::strong_count(gate) <= 2);

        histogram!(METRIC_VOTE_CAST_MS, "target_kind" => target_kind.as_str())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn cast_locked(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        target_kind: TargetKind,
        direction: VoteDirection,
    ) -> Result<VoteReceipt, AppError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let existing = self.votes.find_vote(user_id, target_id).await?;
            let current = VoteState::from_direction(existing.as_ref().map(|v| v.direction));
            let transition = plan_transition(current, direction);
            let delta = CounterDelta {
                upvote: transition.upvote_delta,
                downvote: transition.downvote_delta,
            };

            // One repository call per transition: the ledger row and the
            // counter delta commit together or not at all.
            let applied = match transition.action {
                VoteAction::Create(new_direction) => {
                    self.votes
                        .create_vote(
                            NewVote {
                                user_id,
                                target_id,
                                target_kind,
                                direction: new_direction,
                            },
                            delta,
                        )
                        .await
                }
                VoteAction::Remove => match &existing {
                    Some(vote) => {
                        self.votes
                            .remove_vote(vote.id, vote.direction, target_id, target_kind, delta)
                            .await
                    }
                    None => Err(RepoError::Conflict),
                },
                VoteAction::Flip(new_direction) => match &existing {
                    Some(vote) => {
                        self.votes
                            .flip_vote(
                                vote.id,
                                vote.direction,
                                new_direction,
                                target_id,
                                target_kind,
                                delta,
                            )
                            .await
                    }
                    None => Err(RepoError::Conflict),
                },
            };

            match applied {
                Ok(counters) => {
                    if matches!(transition.action, VoteAction::Create(_))
                        && counters.owner_id != user_id
                    {
                        self.notify(counters.owner_id, target_id, target_kind, direction)
                            .await;
                    }

                    return Ok(VoteReceipt {
                        target_id,
                        target_kind,
                        upvote_count: counters.upvote_count,
                        downvote_count: counters.downvote_count,
                        is_upvoted: transition.next_state.is_upvoted(),
                        is_downvoted: transition.next_state.is_downvoted(),
                    });
                }
                // Another writer won the race on this pair. Re-read the
                // ledger and replan from the fresh state.
                Err(RepoError::Duplicate { .. }) | Err(RepoError::Conflict)
                    if attempt < MAX_CAST_ATTEMPTS =>
                {
                    counter!(METRIC_VOTE_RETRIES, "target_kind" => target_kind.as_str())
                        .increment(1);
                    debug!(%user_id, %target_id, attempt, "Vote cast lost a race, replanning");
                }
                // The transaction rolled back whole; safe to retry.
                Err(err) if err.is_transient() && attempt < MAX_CAST_ATTEMPTS => {
                    warn!(
                        %target_id,
                        attempt,
                        error = %err,
                        "Vote transition failed transiently, retrying"
                    );
                    tokio::time::sleep(TRANSIENT_RETRY_BASE * attempt).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn ensure_target_exists(
        &self,
        target_id: Uuid,
        target_kind: TargetKind,
    ) -> Result<(), AppError> {
        let found = match target_kind {
            TargetKind::Post => self.posts.find_by_id(target_id).await?.is_some(),
            TargetKind::Comment => self.comments.find_by_id(target_id).await?.is_some(),
        };
        if found { Ok(()) } else { Err(AppError::NotFound) }
    }

    /// Notification delivery is best effort. A failure here must never
    /// fail the vote that already committed.
    async fn notify(
        &self,
        owner_id: Uuid,
        target_id: Uuid,
        target_kind: TargetKind,
        direction: VoteDirection,
    ) {
        if let Err(error) = self
            .notifier
            .vote_received(owner_id, target_id, target_kind, direction)
            .await
        {
            warn!(%owner_id, %target_id, %error, "Vote notification failed");
        }
    }
}
