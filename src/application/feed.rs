//! Feed and listing services.
//!
//! Every read goes through the cache facade under the key family and TTL
//! class for its shape. `new` and `top` sorts push ordering into the
//! store; `trending` ranks a bounded pool of recent posts in memory with
//! the decay score, because the score depends on the current clock and
//! cannot be an index order.

use std::cmp::Ordering;
use std::sync::Arc;

use time::OffsetDateTime;
use tracing::instrument;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::pagination::{PageParams, Paginated};
use crate::application::repos::{
    CommentsRepo, CommunitiesRepo, PostQuery, PostsRepo, ProfilesRepo,
};
use crate::cache::{ReadThroughCache, TtlClass, keys};
use crate::domain::entities::{
    CommentRecord, CommunityRecord, MembershipRecord, PostRecord, ProfileAggregate,
};
use crate::domain::ranking::{RankingConfig, decay_score};
use crate::domain::types::{SortOrder, TimeWindow};

/// How far back the trending candidate pool reaches.
const TRENDING_WINDOW: TimeWindow = TimeWindow::Week;

/// Upper bound on the trending candidate pool. Posts past this cutoff are
/// old enough that decay has pushed them out of contention.
const TRENDING_POOL_LIMIT: u32 = 500;

/// Read-side service for feeds, listings, and aggregates.
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    communities: Arc<dyn CommunitiesRepo>,
    profiles: Arc<dyn ProfilesRepo>,
    cache: Arc<ReadThroughCache>,
    ranking: RankingConfig,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        communities: Arc<dyn CommunitiesRepo>,
        profiles: Arc<dyn ProfilesRepo>,
        cache: Arc<ReadThroughCache>,
        ranking: RankingConfig,
    ) -> Self {
        Self {
            posts,
            comments,
            communities,
            profiles,
            cache,
            ranking,
        }
    }

    /// Single post by id.
    #[instrument(skip(self))]
    pub async fn get_post(&self, id: Uuid) -> Result<PostRecord, AppError> {
        let post: Option<PostRecord> = self
            .cache
            .get_or_compute(keys::post(id), TtlClass::Entity, || async move {
                self.posts.find_by_id(id).await.map_err(AppError::from)
            })
            .await?;
        post.ok_or(AppError::NotFound)
    }

    /// Site-wide feed under the requested sort.
    #[instrument(skip(self))]
    pub async fn home_feed(
        &self,
        sort: SortOrder,
        params: PageParams,
    ) -> Result<Paginated<PostRecord>, AppError> {
        let key = keys::feed_page(sort, params.page(), params.limit());
        self.cache
            .get_or_compute(key, TtlClass::Feed, || async move {
                self.list_posts(None, sort, params).await
            })
            .await
    }

    /// Posts within one community under the requested sort.
    #[instrument(skip(self))]
    pub async fn community_posts(
        &self,
        community_id: Uuid,
        sort: SortOrder,
        params: PageParams,
    ) -> Result<Paginated<PostRecord>, AppError> {
        if self.communities.find_by_id(community_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        let key = keys::community_posts(community_id, sort, params.page(), params.limit());
        self.cache
            .get_or_compute(key, TtlClass::Feed, || async move {
                self.list_posts(Some(community_id), sort, params).await
            })
            .await
    }

    /// Highest-differential posts inside a time window.
    #[instrument(skip(self))]
    pub async fn popular(
        &self,
        window: TimeWindow,
        params: PageParams,
    ) -> Result<Paginated<PostRecord>, AppError> {
        let key = keys::popular_page(window, params.page(), params.limit());
        self.cache
            .get_or_compute(key, TtlClass::Feed, || async move {
                let query = PostQuery {
                    created_after: window.since(OffsetDateTime::now_utc()),
                    sort: SortOrder::Top,
                    offset: params.offset(),
                    limit: params.limit(),
                    ..Default::default()
                };
                let items = self.posts.list_posts(&query).await?;
                let total = self.posts.count_posts(&query).await?;
                Ok(Paginated::new(items, params, total))
            })
            .await
    }

    /// Comments on a post, oldest first.
    #[instrument(skip(self))]
    pub async fn post_comments(
        &self,
        post_id: Uuid,
        params: PageParams,
    ) -> Result<Paginated<CommentRecord>, AppError> {
        // 404 for comments of a missing post, not an empty page.
        self.get_post(post_id).await?;
        let key = keys::post_comments(post_id, params.page(), params.limit());
        self.cache
            .get_or_compute(key, TtlClass::Feed, || async move {
                let items = self
                    .comments
                    .list_for_post(post_id, params.offset(), params.limit())
                    .await?;
                let total = self.comments.count_for_post(post_id).await?;
                Ok(Paginated::new(items, params, total))
            })
            .await
    }

    /// Members of a community, newest membership first.
    #[instrument(skip(self))]
    pub async fn community_members(
        &self,
        community_id: Uuid,
        params: PageParams,
    ) -> Result<Paginated<MembershipRecord>, AppError> {
        if self.communities.find_by_id(community_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        let key = keys::community_members(community_id, params.page(), params.limit());
        self.cache
            .get_or_compute(key, TtlClass::Feed, || async move {
                let items = self
                    .communities
                    .list_members(community_id, params.offset(), params.limit())
                    .await?;
                let total = self.communities.count_members(community_id).await?;
                Ok(Paginated::new(items, params, total))
            })
            .await
    }

    /// Communities a user belongs to.
    #[instrument(skip(self))]
    pub async fn user_communities(&self, user_id: Uuid) -> Result<Vec<CommunityRecord>, AppError> {
        self.cache
            .get_or_compute(keys::user_communities(user_id), TtlClass::Entity, || async move {
                self.communities
                    .list_for_user(user_id)
                    .await
                    .map_err(AppError::from)
            })
            .await
    }

    /// Profile aggregate for a user.
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: Uuid) -> Result<ProfileAggregate, AppError> {
        self.cache
            .get_or_compute(keys::profile(user_id), TtlClass::Profile, || async move {
                self.profiles
                    .load_aggregate(user_id)
                    .await
                    .map_err(AppError::from)
            })
            .await
    }

    async fn list_posts(
        &self,
        community_id: Option<Uuid>,
        sort: SortOrder,
        params: PageParams,
    ) -> Result<Paginated<PostRecord>, AppError> {
        match sort {
            SortOrder::New | SortOrder::Top => {
                let query = PostQuery {
                    community_id,
                    sort,
                    offset: params.offset(),
                    limit: params.limit(),
                    ..Default::default()
                };
                let items = self.posts.list_posts(&query).await?;
                let total = self.posts.count_posts(&query).await?;
                Ok(Paginated::new(items, params, total))
            }
            SortOrder::Trending => self.trending_posts(community_id, params).await,
        }
    }

    /// Rank a bounded pool of recent posts by decay score and slice out
    /// the requested page.
    async fn trending_posts(
        &self,
        community_id: Option<Uuid>,
        params: PageParams,
    ) -> Result<Paginated<PostRecord>, AppError> {
        let now = OffsetDateTime::now_utc();
        let query = PostQuery {
            community_id,
            created_after: TRENDING_WINDOW.since(now),
            sort: SortOrder::New,
            offset: 0,
            limit: TRENDING_POOL_LIMIT,
            ..Default::default()
        };
        let mut pool = self.posts.list_posts(&query).await?;

        pool.sort_by(|a, b| {
            let score_a = decay_score(
                a.upvote_count,
                a.downvote_count,
                a.created_at,
                now,
                &self.ranking,
            );
            let score_b = decay_score(
                b.upvote_count,
                b.downvote_count,
                b.created_at,
                now,
                &self.ranking,
            );
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        let total = pool.len() as u64;
        let start = usize::try_from(params.offset()).unwrap_or(usize::MAX);
        let items: Vec<PostRecord> = pool
            .into_iter()
            .skip(start)
            .take(params.limit() as usize)
            .collect();
        Ok(Paginated::new(items, params, total))
    }
}
