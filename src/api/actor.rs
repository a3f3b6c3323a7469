//! Caller identity for administrative requests.

use super::ApiError;
use crate::policy::Actor;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Extracts the [`Actor`] from `x-actor-id` / `x-actor-role`.
///
/// The role is required; a missing id is recorded as `anonymous`.
#[derive(Debug, Clone)]
pub struct ActorHeader(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorHeader
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = header(parts, ACTOR_ROLE_HEADER).ok_or_else(|| {
            ApiError::bad_request(format!("missing '{}' header", ACTOR_ROLE_HEADER))
        })?;
        let id = header(parts, ACTOR_ID_HEADER).unwrap_or("anonymous");
        Ok(ActorHeader(Actor::new(id, role)))
    }
}
