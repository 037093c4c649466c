//! Application state shared by the handlers.

use guestlist_core::providers::{AccessControl, Notifier, Repository};
use guestlist_core::types::{Actor, EventId};
use guestlist_runtime::{
    AuditTrail, CheckInService, GuestlistEnvironment, InvitationService, RevertEngine,
    RsvpService,
};

use crate::error::AppError;

/// Services and collaborators behind the router.
///
/// # Type Parameters
///
/// - `R`: Relational store
/// - `N`: Organizer notification channel
/// - `A`: Access control for administrative routes
pub struct AppState<R, N, A> {
    /// Accept, decline and organizer RSVP edits.
    pub rsvp: RsvpService<R, N>,
    /// Door check-in and attendance toggle.
    pub check_in: CheckInService<R, N>,
    /// Bulk reverts.
    pub revert: RevertEngine<R, N>,
    /// Invitation creation, walk-ins and open tracking.
    pub invitations: InvitationService<R, N>,
    /// Audit retention.
    pub audit: AuditTrail<R, N>,
    /// Store handle for readiness probes.
    pub repository: R,
    /// Role checks.
    pub access: A,
    /// Public page the accept/decline links redirect to, if any.
    pub landing_url: Option<String>,
}

impl<R, N, A> AppState<R, N, A>
where
    R: Repository + Clone,
    N: Notifier + Clone + 'static,
    A: AccessControl,
{
    /// Builds every service over one environment.
    #[must_use]
    pub fn new(env: GuestlistEnvironment<R, N>, access: A) -> Self {
        Self {
            rsvp: RsvpService::new(env.clone()),
            check_in: CheckInService::new(env.clone()),
            revert: RevertEngine::new(env.clone()),
            invitations: InvitationService::new(env.clone()),
            audit: AuditTrail::new(env.clone()),
            repository: env.repository,
            access,
            landing_url: None,
        }
    }

    /// Redirect public RSVP links to `url` instead of answering with JSON.
    #[must_use]
    pub fn with_landing_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.landing_url = (!url.trim().is_empty()).then_some(url);
        self
    }

    /// Requires that `actor` may manage `event_id`.
    pub(crate) async fn authorize(&self, actor: &Actor, event_id: EventId) -> Result<(), AppError> {
        self.access.require_event_access(actor, event_id).await.map_err(AppError::from)
    }
}
