//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{TargetKind, VoteDirection};

/// Denormalized engagement counters embedded on votable entities.
///
/// Counters are kept correct by the vote ledger (votes) and the comment
/// write path (comment_count); they are never allowed below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub comment_count: i64,
}

impl EngagementCounters {
    pub fn differential(&self) -> i64 {
        self.upvote_count - self.downvote_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub community_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub comment_count: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    pub fn counters(&self) -> EngagementCounters {
        EngagementCounters {
            upvote_count: self.upvote_count,
            downvote_count: self.downvote_count,
            comment_count: self.comment_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VoteRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub target_kind: TargetKind,
    pub direction: VoteDirection,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommunityRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MembershipRecord {
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Aggregate engagement figures for a user profile.
///
/// Always derived at read time; cached with the profile TTL class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAggregate {
    pub user_id: Uuid,
    pub post_count: i64,
    pub comment_count: i64,
    pub karma: i64,
}
