use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::pagination::{PageParams, Paginated};
use crate::application::votes::VoteReceipt;
use crate::domain::entities::{
    CommentRecord, CommunityRecord, MembershipRecord, PostRecord, ProfileAggregate,
};
use crate::domain::types::{SortOrder, TargetKind, TimeWindow, VoteDirection};

use super::identity::CallerIdentity;
use super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub target_id: Uuid,
    pub target_kind: TargetKind,
    pub direction: VoteDirection,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub sort: Option<SortOrder>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub window: Option<TimeWindow>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn cast_vote(
    State(state): State<AppState>,
    CallerIdentity(user_id): CallerIdentity,
    Json(request): Json<CastVoteRequest>,
) -> Result<Json<VoteReceipt>, AppError> {
    let receipt = state
        .ledger
        .cast_vote(
            user_id,
            request.target_id,
            request.target_kind,
            request.direction,
        )
        .await?;
    Ok(Json(receipt))
}

pub async fn home_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Paginated<PostRecord>>, AppError> {
    let params = PageParams::new(query.page, query.limit)?;
    let sort = query.sort.unwrap_or_default();
    Ok(Json(state.feed.home_feed(sort, params).await?))
}

pub async fn popular(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Paginated<PostRecord>>, AppError> {
    let params = PageParams::new(query.page, query.limit)?;
    let window = query.window.unwrap_or(TimeWindow::Day);
    Ok(Json(state.feed.popular(window, params).await?))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PostRecord>, AppError> {
    Ok(Json(state.feed.get_post(id).await?))
}

pub async fn post_comments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<CommentRecord>>, AppError> {
    let params = PageParams::new(query.page, query.limit)?;
    Ok(Json(state.feed.post_comments(id, params).await?))
}

pub async fn community_posts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Paginated<PostRecord>>, AppError> {
    let params = PageParams::new(query.page, query.limit)?;
    let sort = query.sort.unwrap_or_default();
    Ok(Json(state.feed.community_posts(id, sort, params).await?))
}

pub async fn community_members(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<MembershipRecord>>, AppError> {
    let params = PageParams::new(query.page, query.limit)?;
    Ok(Json(state.feed.community_members(id, params).await?))
}

pub async fn user_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProfileAggregate>, AppError> {
    Ok(Json(state.feed.profile(id).await?))
}

pub async fn user_communities(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CommunityRecord>>, AppError> {
    Ok(Json(state.feed.user_communities(id).await?))
}

pub async fn healthz(State(state): State<AppState>) -> Response {
    match state.db.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!(error = %err, "Database health check failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
