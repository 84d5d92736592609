//! Change events emitted by the persistence layer.
//!
//! Every tracked collection publishes a notification whenever a row is
//! inserted, updated, or deleted. The payload is a small JSON document
//! carrying the row id plus the foreign keys needed to compute which
//! cached reads are now stale.

use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::types::{ChangeOperation, Collection};

/// Foreign-key references carried alongside a change event.
///
/// Which fields are populated depends on the collection: a comment change
/// carries its `post_id`, a membership change carries `community_id` and
/// `user_id`, and so on. Absent fields simply widen the invalidation to
/// whatever can still be derived.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedRefs {
    pub community_id: Option<Uuid>,
    pub post_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// A single observed mutation on a tracked collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub operation: ChangeOperation,
    pub document_id: Uuid,
    pub refs: ChangedRefs,
}

/// Failure to decode a notification payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed change payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown change operation: {0}")]
    UnknownOperation(String),
}

#[derive(Deserialize)]
struct RawPayload {
    op: String,
    id: Uuid,
    #[serde(default)]
    community_id: Option<Uuid>,
    #[serde(default)]
    post_id: Option<Uuid>,
    #[serde(default)]
    user_id: Option<Uuid>,
}

impl ChangeEvent {
    /// Decode a notification payload received for the given collection.
    pub fn from_payload(collection: Collection, payload: &str) -> Result<Self, PayloadError> {
        let raw: RawPayload = serde_json::from_str(payload)?;
        let operation = match raw.op.as_str() {
            "insert" => ChangeOperation::Insert,
            "update" => ChangeOperation::Update,
            "delete" => ChangeOperation::Delete,
            other => return Err(PayloadError::UnknownOperation(other.to_string())),
        };
        Ok(Self {
            collection,
            operation,
            document_id: raw.id,
            refs: ChangedRefs {
                community_id: raw.community_id,
                post_id: raw.post_id,
                user_id: raw.user_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_post_update() {
        let payload = r#"{"op":"update","id":"4e4cbb60-30a1-4b94-bd0a-b83d63644164","community_id":"9ce211cc-63a4-468d-b492-8c597e436e2f"}"#;
        let event = ChangeEvent::from_payload(Collection::Posts, payload).expect("decode");

        assert_eq!(event.collection, Collection::Posts);
        assert_eq!(event.operation, ChangeOperation::Update);
        assert!(event.refs.community_id.is_some());
        assert!(event.refs.post_id.is_none());
    }

    #[test]
    fn decodes_comment_insert_with_post_ref() {
        let payload = r#"{"op":"insert","id":"4e4cbb60-30a1-4b94-bd0a-b83d63644164","post_id":"9ce211cc-63a4-468d-b492-8c597e436e2f","user_id":"11111111-2222-3333-4444-555555555555"}"#;
        let event = ChangeEvent::from_payload(Collection::Comments, payload).expect("decode");

        assert_eq!(event.operation, ChangeOperation::Insert);
        assert!(event.refs.post_id.is_some());
        assert!(event.refs.user_id.is_some());
    }

    #[test]
    fn rejects_unknown_operation() {
        let payload = r#"{"op":"upsert","id":"4e4cbb60-30a1-4b94-bd0a-b83d63644164"}"#;
        let err = ChangeEvent::from_payload(Collection::Posts, payload).unwrap_err();
        assert!(matches!(err, PayloadError::UnknownOperation(_)));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = ChangeEvent::from_payload(Collection::Posts, "not json").unwrap_err();
        assert!(matches!(err, PayloadError::Malformed(_)));
    }
}
