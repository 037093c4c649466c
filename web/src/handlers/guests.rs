//! Attendance toggle for the organizer dashboard.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use guestlist_core::providers::{AccessControl, Notifier, Repository};
use guestlist_core::types::{Guest, GuestId};
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::AuthenticatedActor;
use crate::state::AppState;

/// Body of `PUT /api/guests/:id/attendance`.
#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    /// Mark (`true`) or unmark (`false`) the guest as present.
    pub present: bool,
}

/// `PUT /api/guests/:id/attendance`
///
/// # Errors
///
/// 401/403, 404 for an unknown guest.
pub async fn set_attendance<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    actor: AuthenticatedActor,
    Path(guest_id): Path<GuestId>,
    Json(request): Json<AttendanceRequest>,
) -> Result<Json<Guest>, AppError>
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    let event_id = state.invitations.guest_event(guest_id).await?;
    state.authorize(&actor.0, event_id).await?;
    let guest = state.check_in.set_attendance(guest_id, request.present, &actor.0).await?;
    Ok(Json(guest))
}
