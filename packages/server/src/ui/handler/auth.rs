//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user id in the `x-user-id` header.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::domain::UserId;

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub UserId);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|id| Identity(UserId::new(id)))
            .ok_or_else(ApiError::missing_identity)
    }
}
