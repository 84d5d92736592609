use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::application::repos::{CounterDelta, NewVote, RepoError, TargetCounters, VotesRepo};
use crate::domain::entities::VoteRecord;
use crate::domain::types::{TargetKind, VoteDirection};

use super::{PostgresRepositories, map_sqlx_error};

const VOTE_COLUMNS: &str = "id, user_id, target_id, target_kind, direction, created_at";

#[derive(sqlx::FromRow)]
struct CounterRow {
    author_id: Uuid,
    upvote_count: i64,
    downvote_count: i64,
}

/// Applies the counter delta to the vote's target inside `tx`, flooring the
/// stored counters at zero, and returns the counters as committed.
async fn apply_target_delta(
    tx: &mut Transaction<'_, Postgres>,
    target_id: Uuid,
    target_kind: TargetKind,
    delta: CounterDelta,
) -> Result<TargetCounters, RepoError> {
    let sql = match target_kind {
        TargetKind::Post => {
            "UPDATE posts SET \
                 upvote_count = GREATEST(0, upvote_count + $1), \
                 downvote_count = GREATEST(0, downvote_count + $2), \
                 updated_at = now() \
             WHERE id = $3 \
             RETURNING author_id, upvote_count, downvote_count"
        }
        TargetKind::Comment => {
            "UPDATE comments SET \
                 upvote_count = GREATEST(0, upvote_count + $1), \
                 downvote_count = GREATEST(0, downvote_count + $2) \
             WHERE id = $3 \
             RETURNING author_id, upvote_count, downvote_count"
        }
    };

    let row = sqlx::query_as::<_, CounterRow>(sql)
        .bind(delta.upvote)
        .bind(delta.downvote)
        .bind(target_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

    Ok(TargetCounters {
        owner_id: row.author_id,
        upvote_count: row.upvote_count,
        downvote_count: row.downvote_count,
    })
}

#[async_trait]
impl VotesRepo for PostgresRepositories {
    async fn find_vote(
        &self,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<VoteRecord>, RepoError> {
        sqlx::query_as::<_, VoteRecord>(&format!(
            "SELECT {VOTE_COLUMNS} FROM votes WHERE user_id = $1 AND target_id = $2"
        ))
        .bind(user_id)
        .bind(target_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn create_vote(
        &self,
        vote: NewVote,
        delta: CounterDelta,
    ) -> Result<TargetCounters, RepoError> {
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        // The unique index on (user_id, target_id) turns a write race into
        // a Duplicate error the ledger replans from; the transaction rolls
        // back with the counters untouched.
        sqlx::query(
            "INSERT INTO votes (id, user_id, target_id, target_kind, direction) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(vote.user_id)
        .bind(vote.target_id)
        .bind(vote.target_kind)
        .bind(vote.direction)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let counters = apply_target_delta(&mut tx, vote.target_id, vote.target_kind, delta).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
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
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM votes WHERE id = $1 AND direction = $2")
            .bind(vote_id)
            .bind(expected)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::Conflict);
        }

        let counters = apply_target_delta(&mut tx, target_id, target_kind, delta).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(counters)
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
        let mut tx = self.pool().begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query("UPDATE votes SET direction = $1 WHERE id = $2 AND direction = $3")
            .bind(direction)
            .bind(vote_id)
            .bind(expected)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::Conflict);
        }

        let counters = apply_target_delta(&mut tx, target_id, target_kind, delta).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(counters)
    }
}
