use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::application::repos::{PostQuery, PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::types::SortOrder;

use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str = "id, author_id, community_id, title, body, \
     upvote_count, downvote_count, comment_count, created_at, updated_at";

fn apply_query_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, query: &'q PostQuery) {
    if let Some(community_id) = query.community_id {
        qb.push(" AND community_id = ");
        qb.push_bind(community_id);
    }
    if let Some(author_id) = query.author_id {
        qb.push(" AND author_id = ");
        qb.push_bind(author_id);
    }
    if let Some(created_after) = query.created_after {
        qb.push(" AND created_at >= ");
        qb.push_bind(created_after);
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: SortOrder) {
    match sort {
        // Trending never orders in SQL; the service ranks a recency pool
        // in memory, so it falls back to created order here.
        SortOrder::New | SortOrder::Trending => {
            qb.push(" ORDER BY created_at DESC, id DESC");
        }
        SortOrder::Top => {
            qb.push(" ORDER BY (upvote_count - downvote_count) DESC, created_at DESC, id DESC");
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE 1=1 "));
        apply_query_filter(&mut qb, query);
        push_order(&mut qb, query.sort);
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(query.limit));
        qb.push(" OFFSET ");
        qb.push_bind(query.offset as i64);

        qb.build_query_as::<PostRecord>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_posts(&self, query: &PostQuery) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts WHERE 1=1 ");
        apply_query_filter(&mut qb, query);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
