//! Static invalidation table.
//!
//! Maps a change event to the cache key patterns that must be dropped.
//! The table over-invalidates on purpose: when a foreign key is missing
//! from the payload the affected listing families are dropped wholesale
//! rather than risking a stale read.

use super::events::ChangeEvent;
use super::keys;
use crate::domain::types::{ChangeOperation, Collection};

/// Compute the key patterns invalidated by a change event.
pub fn invalidation_patterns(event: &ChangeEvent) -> Vec<String> {
    let mut patterns = Vec::new();

    match event.collection {
        Collection::Posts => {
            patterns.push(keys::FEED_PATTERN.to_string());
            patterns.push(keys::POPULAR_PATTERN.to_string());
            patterns.push(keys::post_pattern(event.document_id));
            if let Some(community_id) = event.refs.community_id {
                patterns.push(keys::community_posts_pattern(community_id));
            }
            if let Some(user_id) = event.refs.user_id {
                patterns.push(keys::profile_pattern(user_id));
            }
            if event.operation == ChangeOperation::Delete {
                patterns.push(keys::post_comments_pattern(event.document_id));
            }
        }
        Collection::Comments => {
            if let Some(post_id) = event.refs.post_id {
                patterns.push(keys::post_comments_pattern(post_id));
                patterns.push(keys::post_pattern(post_id));
            }
            // Comment counts are rendered on feed rows.
            patterns.push(keys::FEED_PATTERN.to_string());
            patterns.push(keys::POPULAR_PATTERN.to_string());
            if let Some(user_id) = event.refs.user_id {
                patterns.push(keys::profile_pattern(user_id));
            }
        }
        Collection::Communities => {
            patterns.push(keys::community_posts_pattern(event.document_id));
            patterns.push(keys::community_members_pattern(event.document_id));
            // Community names appear in every membership listing.
            patterns.push("user_communities:*".to_string());
        }
        Collection::Memberships => {
            if let Some(community_id) = event.refs.community_id {
                patterns.push(keys::community_members_pattern(community_id));
            }
            if let Some(user_id) = event.refs.user_id {
                patterns.push(keys::user_communities_pattern(user_id));
            }
        }
    }

    patterns
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::cache::events::ChangedRefs;

    fn event(
        collection: Collection,
        operation: ChangeOperation,
        refs: ChangedRefs,
    ) -> ChangeEvent {
        ChangeEvent {
            collection,
            operation,
            document_id: Uuid::nil(),
            refs,
        }
    }

    #[test]
    fn post_update_drops_feeds_and_entity() {
        let community_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();
        let patterns = invalidation_patterns(&event(
            Collection::Posts,
            ChangeOperation::Update,
            ChangedRefs {
                community_id: Some(community_id),
                post_id: None,
                user_id: Some(author_id),
            },
        ));

        assert!(patterns.contains(&"feed:*".to_string()));
        assert!(patterns.contains(&"popular:*".to_string()));
        assert!(patterns.contains(&format!("post:{}", Uuid::nil())));
        assert!(patterns.contains(&format!("community_posts:{community_id}:*")));
        assert!(patterns.contains(&format!("profile:{author_id}")));
        // Update keeps comment listings alive.
        assert!(!patterns.iter().any(|p| p.starts_with("post_comments:")));
    }

    #[test]
    fn post_delete_also_drops_its_comments() {
        let patterns = invalidation_patterns(&event(
            Collection::Posts,
            ChangeOperation::Delete,
            ChangedRefs::default(),
        ));

        assert!(patterns.contains(&format!("post_comments:{}:*", Uuid::nil())));
    }

    #[test]
    fn comment_insert_targets_parent_post() {
        let post_id = Uuid::new_v4();
        let patterns = invalidation_patterns(&event(
            Collection::Comments,
            ChangeOperation::Insert,
            ChangedRefs {
                community_id: None,
                post_id: Some(post_id),
                user_id: None,
            },
        ));

        assert!(patterns.contains(&format!("post_comments:{post_id}:*")));
        assert!(patterns.contains(&format!("post:{post_id}")));
        assert!(patterns.contains(&"feed:*".to_string()));
    }

    #[test]
    fn membership_change_stays_narrow() {
        let community_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let patterns = invalidation_patterns(&event(
            Collection::Memberships,
            ChangeOperation::Insert,
            ChangedRefs {
                community_id: Some(community_id),
                post_id: None,
                user_id: Some(user_id),
            },
        ));

        assert_eq!(
            patterns,
            vec![
                format!("community_members:{community_id}:*"),
                format!("user_communities:{user_id}"),
            ]
        );
    }
}
