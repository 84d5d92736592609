use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{CommunitiesRepo, RepoError};
use crate::domain::entities::{CommunityRecord, MembershipRecord};

use super::{PostgresRepositories, map_sqlx_error};

const COMMUNITY_COLUMNS: &str = "id, slug, name, description, created_at, updated_at";

#[async_trait]
impl CommunitiesRepo for PostgresRepositories {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommunityRecord>, RepoError> {
        sqlx::query_as::<_, CommunityRecord>(&format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_members(
        &self,
        community_id: Uuid,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<MembershipRecord>, RepoError> {
        sqlx::query_as::<_, MembershipRecord>(
            "SELECT community_id, user_id, created_at FROM community_members \
             WHERE community_id = $1 \
             ORDER BY created_at DESC, user_id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(community_id)
        .bind(i64::from(limit))
        .bind(offset as i64)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_members(&self, community_id: Uuid) -> Result<u64, RepoError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM community_members WHERE community_id = $1")
                .bind(community_id)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CommunityRecord>, RepoError> {
        sqlx::query_as::<_, CommunityRecord>(
            "SELECT c.id, c.slug, c.name, c.description, c.created_at, c.updated_at \
             FROM communities c \
             INNER JOIN community_members m ON m.community_id = c.id \
             WHERE m.user_id = $1 \
             ORDER BY m.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
