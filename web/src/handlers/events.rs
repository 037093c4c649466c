//! Organizer endpoints scoped to an event.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use guestlist_core::providers::{AccessControl, Notifier, Repository};
use guestlist_core::types::{EventId, GuestId, Invitation, InvitationDetails, WalkIn};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::AuthenticatedActor;
use crate::state::AppState;

/// Body of `POST /api/events/:id/invitations`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvitationRequest {
    /// Guest to invite.
    pub guest_id: GuestId,
    /// Declared party size.
    #[serde(default)]
    pub accompanying_guests_count: u32,
}

/// Body of `POST /api/events/:id/revert-column-changes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertColumnsRequest {
    /// Look-back window in hours.
    #[serde(default)]
    pub since_hours: Option<u32>,
}

/// Reply of both revert endpoints.
#[derive(Debug, Serialize)]
pub struct RevertResponse {
    /// Human-readable summary.
    pub message: String,
    /// Number of records restored.
    pub reverted: u64,
}

/// `POST /api/events/:id/invitations`
///
/// Answers 201 with a new invitation, or 200 with the guest's existing one.
///
/// # Errors
///
/// 401/403, 404 for an unknown event or guest, 422 for a guest of another
/// event or an oversized party.
pub async fn generate_invitation<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Path(event_id): Path<EventId>,
    Json(request): Json<GenerateInvitationRequest>,
) -> Result<(StatusCode, Json<Invitation>), AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    state.authorize(&actor.0, event_id).await?;
    let generated = state
        .invitations
        .generate(event_id, request.guest_id, request.accompanying_guests_count, &actor.0)
        .await?;
    let status = if generated.created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(generated.invitation)))
}

/// `POST /api/events/:id/walk-ins`
///
/// # Errors
///
/// 401/403, 404 for an unknown event, 422 for a blank name or an oversized
/// party.
pub async fn add_walk_in<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Path(event_id): Path<EventId>,
    Json(walk_in): Json<WalkIn>,
) -> Result<(StatusCode, Json<InvitationDetails>), AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    state.authorize(&actor.0, event_id).await?;
    let details = state.invitations.quick_add(event_id, walk_in, &actor.0).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// `POST /api/events/:id/revert-responses`
///
/// # Errors
///
/// 401/403, 404 for an unknown event, 500 if the transaction fails.
pub async fn revert_responses<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Path(event_id): Path<EventId>,
) -> Result<Json<RevertResponse>, AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    state.authorize(&actor.0, event_id).await?;
    let summary = state.revert.revert_responses(event_id, &actor.0).await?;
    Ok(Json(RevertResponse {
        message: format!("Reverted {} responses", summary.reverted),
        reverted: summary.reverted,
    }))
}

/// `POST /api/events/:id/revert-column-changes`
///
/// The body is optional; without `sinceHours` the default window applies.
///
/// # Errors
///
/// 401/403, 404 for an unknown event, 422 for a window out of range.
pub async fn revert_column_changes<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Path(event_id): Path<EventId>,
    request: Option<Json<RevertColumnsRequest>>,
) -> Result<Json<RevertResponse>, AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    state.authorize(&actor.0, event_id).await?;
    let since_hours = request.and_then(|Json(r)| r.since_hours);
    let summary = state.revert.revert_column_changes(event_id, since_hours, &actor.0).await?;
    Ok(Json(RevertResponse {
        message: format!("Reverted column changes for {} guests", summary.reverted),
        reverted: summary.reverted,
    }))
}
