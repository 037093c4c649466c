//! Router composition.
//!
//! Composes every handler into a single Axum router.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use guestlist_core::providers::{AccessControl, Notifier, Repository};
use tower_http::trace::TraceLayer;

use crate::handlers::{audit, check_in, events, guests, health, invitations, rsvp};
use crate::middleware::request_context_layer;
use crate::state::AppState;

/// Create the application router.
///
/// # Routes
///
/// ## Public links
/// - `GET|POST /rsvp/accept/:token` - Accept an invitation
/// - `GET|POST /rsvp/decline/:token` - Decline an invitation
/// - `GET /rsvp/open/:token` - Email open tracking pixel
/// - `POST /checkin` - Door check-in by QR token
///
/// ## Organizer (`X-Actor-Id` required)
/// - `GET|PATCH /api/invitations/:id` - Details and manual update
/// - `POST /api/invitations/:id/accept-on-behalf` - Accept for a guest
/// - `POST /api/invitations/:id/regenerate-tokens` - Issue fresh tokens
/// - `PUT /api/guests/:id/attendance` - Toggle attendance
/// - `POST /api/events/:id/invitations` - Generate an invitation
/// - `POST /api/events/:id/walk-ins` - Quick add a walk-in
/// - `POST /api/events/:id/revert-responses` - Revert every response
/// - `POST /api/events/:id/revert-column-changes` - Revert recent edits
/// - `DELETE /api/audit-logs?olderThanDays=N` - Audit retention (admin)
///
/// ## Probes
/// - `GET /health` - Liveness
/// - `GET /ready` - Database readiness
///
/// # Example
///
/// ```rust,ignore
/// let state = AppState::new(environment, PostgresAccessControl::new(pool));
/// let listener = tokio::net::TcpListener::bind(addr).await?;
/// axum::serve(listener, router(state)).await?;
/// ```
pub fn router<R, N, A>(state: AppState<R, N, A>) -> Router
where
    R: Repository + Clone + 'static,
    N: Notifier + Clone + 'static,
    A: AccessControl + 'static,
{
    Router::new()
        // Public token links
        .route(
            "/rsvp/accept/:token",
            get(rsvp::accept_link::<R, N, A>).post(rsvp::accept_submit::<R, N, A>),
        )
        .route(
            "/rsvp/decline/:token",
            get(rsvp::decline_link::<R, N, A>).post(rsvp::decline_submit::<R, N, A>),
        )
        .route("/rsvp/open/:token", get(rsvp::tracking_pixel::<R, N, A>))
        .route("/checkin", post(check_in::check_in::<R, N, A>))

        // Invitations
        .route(
            "/api/invitations/:id",
            get(invitations::get_invitation::<R, N, A>)
                .patch(invitations::update_invitation::<R, N, A>),
        )
        .route(
            "/api/invitations/:id/accept-on-behalf",
            post(invitations::accept_on_behalf::<R, N, A>),
        )
        .route(
            "/api/invitations/:id/regenerate-tokens",
            post(invitations::regenerate_tokens::<R, N, A>),
        )

        // Guests
        .route("/api/guests/:id/attendance", put(guests::set_attendance::<R, N, A>))

        // Events
        .route("/api/events/:id/invitations", post(events::generate_invitation::<R, N, A>))
        .route("/api/events/:id/walk-ins", post(events::add_walk_in::<R, N, A>))
        .route(
            "/api/events/:id/revert-responses",
            post(events::revert_responses::<R, N, A>),
        )
        .route(
            "/api/events/:id/revert-column-changes",
            post(events::revert_column_changes::<R, N, A>),
        )

        // Audit
        .route("/api/audit-logs", delete(audit::prune_audit_log::<R, N, A>))

        // Probes
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check::<R, N, A>))

        .with_state(Arc::new(state))
        .layer(request_context_layer())
        .layer(TraceLayer::new_for_http())
}
