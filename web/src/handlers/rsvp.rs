//! Public RSVP links: accept, decline and the open-tracking pixel.
//!
//! These routes are authorized by possession of the token alone. Unknown
//! and malformed tokens are indistinguishable to the caller.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
};
use guestlist_core::GuestlistError;
use guestlist_core::providers::{AccessControl, Notifier, Repository};
use guestlist_core::rsvp::RsvpOutcome;
use guestlist_core::tokens::{AcceptToken, DeclineToken, OpaqueToken, TrackingToken};
use guestlist_core::types::{InvitationDetails, PartyDeclaration};
use guestlist_runtime::RsvpReceipt;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// 1×1 transparent GIF.
pub const TRACKING_PIXEL: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

/// Result of following an RSVP link, as reported to the landing page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStatus {
    /// The invitation is now accepted.
    Accepted,
    /// It was accepted before.
    AlreadyAccepted,
    /// The invitation is now declined.
    Declined,
    /// It was declined before.
    AlreadyDeclined,
    /// No invitation carries the token.
    NotFound,
}

impl LinkStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::AlreadyAccepted => "already-accepted",
            Self::Declined => "declined",
            Self::AlreadyDeclined => "already-declined",
            Self::NotFound => "not-found",
        }
    }

    const fn of(outcome: RsvpOutcome) -> Self {
        match outcome {
            RsvpOutcome::AlreadyAccepted => Self::AlreadyAccepted,
            RsvpOutcome::Declined => Self::Declined,
            RsvpOutcome::AlreadyDeclined => Self::AlreadyDeclined,
            RsvpOutcome::Accepted | RsvpOutcome::Updated | RsvpOutcome::TokensRegenerated => {
                Self::Accepted
            }
        }
    }
}

#[derive(Serialize)]
struct LinkResponse {
    status: LinkStatus,
    invitation: InvitationDetails,
}

fn parse_token<T: OpaqueToken>(raw: &str) -> Result<T, GuestlistError> {
    T::parse(raw).map_err(|_| GuestlistError::not_found("invitation"))
}

fn landing_redirect(landing: &str, status: LinkStatus) -> Response {
    let separator = if landing.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{landing}{separator}status={}", status.as_str())).into_response()
}

/// Turns a link outcome into a redirect (browser GET with a landing page)
/// or a JSON body.
fn respond(
    landing: Option<&str>,
    result: Result<RsvpReceipt, GuestlistError>,
) -> Result<Response, AppError> {
    match (result, landing) {
        (Ok(receipt), Some(landing)) => {
            Ok(landing_redirect(landing, LinkStatus::of(receipt.outcome)))
        }
        (Ok(receipt), None) => Ok(Json(LinkResponse {
            status: LinkStatus::of(receipt.outcome),
            invitation: receipt.details,
        })
        .into_response()),
        (Err(GuestlistError::NotFound { .. }), Some(landing)) => {
            Ok(landing_redirect(landing, LinkStatus::NotFound))
        }
        (Err(e), _) => Err(e.into()),
    }
}

async fn accept<R, N, A>(
    state: &AppState<R, N, A>,
    raw: &str,
    party: PartyDeclaration,
) -> Result<RsvpReceipt, GuestlistError>
where
    R: Repository,
    N: Notifier + Clone + 'static,
{
    let token: AcceptToken = parse_token(raw)?;
    state.rsvp.accept(&token, party).await
}

async fn decline<R, N, A>(
    state: &AppState<R, N, A>,
    raw: &str,
) -> Result<RsvpReceipt, GuestlistError>
where
    R: Repository,
    N: Notifier + Clone + 'static,
{
    let token: DeclineToken = parse_token(raw)?;
    state.rsvp.decline(&token).await
}

/// `GET /rsvp/accept/:token`
///
/// # Errors
///
/// 404 for an unknown token (JSON mode), 500 on storage failure.
pub async fn accept_link<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    Path(token): Path<String>,
) -> Result<Response, AppError>
where
    R: Repository + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    let result = accept(&state, &token, PartyDeclaration::default()).await;
    respond(state.landing_url.as_deref(), result)
}

/// `POST /rsvp/accept/:token` with an optional party declaration.
///
/// Always answers with JSON.
///
/// # Errors
///
/// 404 for an unknown token, 422 for an invalid party, 500 on storage
/// failure.
pub async fn accept_submit<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    Path(token): Path<String>,
    party: Option<Json<PartyDeclaration>>,
) -> Result<Response, AppError>
where
    R: Repository + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    let party = party.map(|Json(p)| p).unwrap_or_default();
    let result = accept(&state, &token, party).await;
    respond(None, result)
}

/// `GET /rsvp/decline/:token`
///
/// # Errors
///
/// 404 for an unknown token (JSON mode), 500 on storage failure.
pub async fn decline_link<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    Path(token): Path<String>,
) -> Result<Response, AppError>
where
    R: Repository + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    let result = decline(&state, &token).await;
    respond(state.landing_url.as_deref(), result)
}

/// `POST /rsvp/decline/:token`
///
/// # Errors
///
/// 404 for an unknown token, 500 on storage failure.
pub async fn decline_submit<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    Path(token): Path<String>,
) -> Result<Response, AppError>
where
    R: Repository + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    let result = decline(&state, &token).await;
    respond(None, result)
}

/// `GET /rsvp/open/:token`
///
/// Always answers with the pixel, whatever happened to the token.
pub async fn tracking_pixel<R, N, A>(
    State(state): State<Arc<AppState<R, N, A>>>,
    Path(token): Path<String>,
) -> impl IntoResponse
where
    R: Repository + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    if let Ok(token) = TrackingToken::parse(&token) {
        if let Err(e) = state.invitations.track_open(&token).await {
            tracing::warn!(error = %e, "Failed to record invitation open");
        }
    }

    (
        [(header::CONTENT_TYPE, "image/gif"), (header::CACHE_CONTROL, "no-store, max-age=0")],
        TRACKING_PIXEL.as_slice(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_url_keeps_existing_query() {
        let plain = landing_redirect("https://example.com/rsvp", LinkStatus::Declined);
        let with_query = landing_redirect("https://example.com/rsvp?lang=de", LinkStatus::NotFound);

        assert_eq!(
            plain.headers()[header::LOCATION],
            "https://example.com/rsvp?status=declined"
        );
        assert_eq!(
            with_query.headers()[header::LOCATION],
            "https://example.com/rsvp?lang=de&status=not-found"
        );
    }

    #[test]
    fn pixel_is_a_gif() {
        assert!(TRACKING_PIXEL.starts_with(b"GIF89a"));
        assert_eq!(TRACKING_PIXEL.last(), Some(&0x3B));
    }
}
