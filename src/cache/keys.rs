//! Cache key builders.
//!
//! Keys are flat strings with colon-separated segments so that whole key
//! families can be dropped with a single wildcard pattern. The first
//! segment names the family, the remaining segments identify the exact
//! entry. Patterns use `*` to match any single trailing run of segments.

use uuid::Uuid;

use crate::domain::types::{SortOrder, TimeWindow};

/// Home feed page: `feed:{sort}:{page}:{limit}`.
pub fn feed_page(sort: SortOrder, page: u32, limit: u32) -> String {
    format!("feed:{}:{page}:{limit}", sort.as_str())
}

/// Popular listing page: `popular:{window}:{page}:{limit}`.
pub fn popular_page(window: TimeWindow, page: u32, limit: u32) -> String {
    format!("popular:{}:{page}:{limit}", window.as_str())
}

/// Single post: `post:{id}`.
pub fn post(id: Uuid) -> String {
    format!("post:{id}")
}

/// Comment listing for a post: `post_comments:{post_id}:{page}:{limit}`.
pub fn post_comments(post_id: Uuid, page: u32, limit: u32) -> String {
    format!("post_comments:{post_id}:{page}:{limit}")
}

/// Posts in a community: `community_posts:{community_id}:{sort}:{page}:{limit}`.
pub fn community_posts(community_id: Uuid, sort: SortOrder, page: u32, limit: u32) -> String {
    format!(
        "community_posts:{community_id}:{}:{page}:{limit}",
        sort.as_str()
    )
}

/// Member listing for a community: `community_members:{community_id}:{page}:{limit}`.
pub fn community_members(community_id: Uuid, page: u32, limit: u32) -> String {
    format!("community_members:{community_id}:{page}:{limit}")
}

/// Communities a user belongs to: `user_communities:{user_id}`.
pub fn user_communities(user_id: Uuid) -> String {
    format!("user_communities:{user_id}")
}

/// Profile aggregate: `profile:{user_id}`.
pub fn profile(user_id: Uuid) -> String {
    format!("profile:{user_id}")
}

// ============================================================================
// Invalidation patterns
// ============================================================================

/// All home feed pages regardless of sort or pagination.
pub const FEED_PATTERN: &str = "feed:*";

/// All popular listing pages regardless of window.
pub const POPULAR_PATTERN: &str = "popular:*";

pub fn post_pattern(id: Uuid) -> String {
    format!("post:{id}")
}

pub fn post_comments_pattern(post_id: Uuid) -> String {
    format!("post_comments:{post_id}:*")
}

pub fn community_posts_pattern(community_id: Uuid) -> String {
    format!("community_posts:{community_id}:*")
}

pub fn community_members_pattern(community_id: Uuid) -> String {
    format!("community_members:{community_id}:*")
}

pub fn user_communities_pattern(user_id: Uuid) -> String {
    format!("user_communities:{user_id}")
}

pub fn profile_pattern(user_id: Uuid) -> String {
    format!("profile:{user_id}")
}
