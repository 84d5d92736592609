//! HTTP surface.
//!
//! A thin JSON API over the vote ledger and the feed services. Caller
//! identity arrives in the `x-user-id` header set by the gateway.

mod handlers;
mod identity;
mod state;

pub use identity::{CallerIdentity, USER_ID_HEADER};
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/votes", post(handlers::cast_vote))
        .route("/api/feed", get(handlers::home_feed))
        .route("/api/popular", get(handlers::popular))
        .route("/api/posts/{id}", get(handlers::get_post))
        .route("/api/posts/{id}/comments", get(handlers::post_comments))
        .route(
            "/api/communities/{id}/posts",
            get(handlers::community_posts),
        )
        .route(
            "/api/communities/{id}/members",
            get(handlers::community_members),
        )
        .route("/api/users/{id}/profile", get(handlers::user_profile))
        .route(
            "/api/users/{id}/communities",
            get(handlers::user_communities),
        )
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
