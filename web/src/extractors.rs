//! Custom Axum extractors.
//!
//! - `CorrelationId`: extract or generate request correlation IDs
//! - `AuthenticatedActor`: the organizer named by the upstream proxy

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use guestlist_core::types::{Actor, UserId};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;

/// Header carrying the authenticated organizer's account id.
///
/// Set by the authenticating proxy in front of the service; requests from
/// the open internet must never be able to supply it.
pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";

/// Correlation ID for request tracing.
///
/// Extracts the correlation ID from the `X-Correlation-ID` header,
/// or generates a new UUID v4 if not present.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The middleware stores the id it settled on; prefer that.
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }
        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// The organizer performing an administrative request.
///
/// Rejects with 401 when the `X-Actor-Id` header is missing or not a UUID.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::unauthorized("authentication required"))?;

        Ok(Self(Actor::new(UserId::from_uuid(user_id))))
    }
}
