//! Caller identity extraction.
//!
//! The service sits behind a gateway that authenticates callers and
//! forwards the resolved user id in the `x-user-id` header. Write paths
//! require it; read paths ignore it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::application::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller id taken from the gateway header.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;
        let user_id = Uuid::parse_str(value).map_err(|_| AppError::Unauthorized)?;
        Ok(CallerIdentity(user_id))
    }
}
