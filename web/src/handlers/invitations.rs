//! Organizer endpoints on a single invitation.
//!
//! Each handler resolves the owning event first and checks the actor's
//! access to it before touching the invitation.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use guestlist_core::providers::{AccessControl, Notifier, Repository};
use guestlist_core::types::{InvitationDetails, InvitationId, InvitationPatch};

use crate::error::AppError;
use crate::extractors::AuthenticatedActor;
use crate::state::AppState;

async fn authorize_invitation<R, N, A>(
    state: &AppState<R, N, A>,
    actor: &AuthenticatedActor,
    id: InvitationId,
) -> Result<(), AppError>
where
    R: Repository + Clone,
    N: Notifier + Clone + 'static,
    A: AccessControl,
{
    let event_id = state.invitations.invitation_event(id).await?;
    state.authorize(&actor.0, event_id).await
}

/// `GET /api/invitations/:id`
///
/// # Errors
///
/// 401 without an actor, 403 without event access, 404 for an unknown id.
pub async fn get_invitation<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Path(id): Path<InvitationId>,
) -> Result<Json<InvitationDetails>, AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    authorize_invitation(&state, &actor, id).await?;
    Ok(Json(state.invitations.details(id).await?))
}

/// `PATCH /api/invitations/:id`
///
/// # Errors
///
/// 401/403/404 as for reads, 422 for an oversized party.
pub async fn update_invitation<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Path(id): Path<InvitationId>,
    Json(patch): Json<InvitationPatch>,
) -> Result<Json<InvitationDetails>, AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    authorize_invitation(&state, &actor, id).await?;
    Ok(Json(state.rsvp.manual_update(id, patch, &actor.0).await?))
}

/// `POST /api/invitations/:id/accept-on-behalf`
///
/// # Errors
///
/// 401/403/404 as for reads, 400 if the invitation is not pending.
pub async fn accept_on_behalf<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Path(id): Path<InvitationId>,
) -> Result<Json<InvitationDetails>, AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    authorize_invitation(&state, &actor, id).await?;
    Ok(Json(state.rsvp.accept_on_behalf(id, &actor.0).await?))
}

/// `POST /api/invitations/:id/regenerate-tokens`
///
/// # Errors
///
/// 401/403/404 as for reads.
pub async fn regenerate_tokens<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Path(id): Path<InvitationId>,
) -> Result<Json<InvitationDetails>, AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    authorize_invitation(&state, &actor, id).await?;
    Ok(Json(state.rsvp.regenerate_tokens(id, &actor.0).await?))
}
