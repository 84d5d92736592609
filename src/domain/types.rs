//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

/// Votable entity kinds (mirrors Postgres enum `vote_target_kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "vote_target_kind", rename_all = "snake_case")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Post => "post",
            TargetKind::Comment => "comment",
        }
    }
}

/// Vote directions (mirrors Postgres enum `vote_direction`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "vote_direction", rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

/// Named sort strategies for post listings.
///
/// Deliberately three distinct strategies: `Trending` uses the decay score,
/// `Top` is raw vote differential, `New` is recency. They are not unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    New,
    Top,
    Trending,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::New
    }
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::New => "new",
            SortOrder::Top => "top",
            SortOrder::Trending => "trending",
        }
    }
}

/// Time window for popularity-ranked listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Day,
    Week,
    Month,
    All,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::All => "all",
        }
    }

    /// Lower bound of the window relative to `now`, or `None` for `All`.
    pub fn since(self, now: time::OffsetDateTime) -> Option<time::OffsetDateTime> {
        match self {
            TimeWindow::Day => Some(now - time::Duration::days(1)),
            TimeWindow::Week => Some(now - time::Duration::weeks(1)),
            TimeWindow::Month => Some(now - time::Duration::days(30)),
            TimeWindow::All => None,
        }
    }
}

/// Collections observed by the change-capture router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Posts,
    Comments,
    Communities,
    Memberships,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Posts,
        Collection::Comments,
        Collection::Communities,
        Collection::Memberships,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Posts => "posts",
            Collection::Comments => "comments",
            Collection::Communities => "communities",
            Collection::Memberships => "memberships",
        }
    }
}

/// Mutation kinds carried on a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}
