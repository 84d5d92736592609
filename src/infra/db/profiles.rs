use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{ProfilesRepo, RepoError};
use crate::domain::entities::ProfileAggregate;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ProfileRow {
    post_count: i64,
    comment_count: i64,
    karma: i64,
}

#[async_trait]
impl ProfilesRepo for PostgresRepositories {
    /// Karma is derived at read time from the author's post and comment
    /// counters rather than maintained as its own stored counter.
    async fn load_aggregate(&self, user_id: Uuid) -> Result<ProfileAggregate, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT \
                 (SELECT COUNT(*) FROM posts WHERE author_id = $1) AS post_count, \
                 (SELECT COUNT(*) FROM comments WHERE author_id = $1) AS comment_count, \
                 (COALESCE((SELECT SUM(upvote_count - downvote_count) \
                            FROM posts WHERE author_id = $1), 0) \
                  + COALESCE((SELECT SUM(upvote_count - downvote_count) \
                              FROM comments WHERE author_id = $1), 0))::BIGINT AS karma",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProfileAggregate {
            user_id,
            post_count: row.post_count,
            comment_count: row.comment_count,
            karma: row.karma,
        })
    }
}
