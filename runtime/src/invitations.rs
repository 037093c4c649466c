//! Invitation lifecycle outside the RSVP state machine: generation,
//! front-desk walk-ins, reads and open tracking.

use guestlist_core::attributes::AttributeBag;
use guestlist_core::audit::AuditContext;
use guestlist_core::providers::{Repository, RepositoryTx};
use guestlist_core::rsvp::{RsvpCommand, RsvpReducer, RsvpState};
use guestlist_core::tokens::{TokenIssuer, TrackingToken};
use guestlist_core::types::{
    Actor, EventId, Guest, GuestId, GuestStatus, Invitation, InvitationDetails, InvitationId,
    PartyDeclaration, WalkIn,
};
use guestlist_core::{GuestlistError, Result};

use crate::environment::GuestlistEnvironment;
use crate::persist;

/// Result of [`InvitationService::generate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generated {
    /// The guest's invitation for the event.
    pub invitation: Invitation,
    /// `false` if it already existed and was returned unchanged.
    pub created: bool,
}

/// Invitation creation and lookup.
#[derive(Clone)]
pub struct InvitationService<R, N> {
    env: GuestlistEnvironment<R, N>,
    reducer: RsvpReducer,
}

impl<R, N> InvitationService<R, N>
where
    R: Repository,
{
    /// Creates the service.
    #[must_use]
    pub fn new(env: GuestlistEnvironment<R, N>) -> Self {
        let reducer = RsvpReducer::new(env.settings.clone());
        Self { env, reducer }
    }

    /// Creates the `PENDING` invitation of a guest, or returns the existing
    /// one unchanged.
    ///
    /// # Errors
    ///
    /// - `Validation` if the party size is above the limit, or the guest
    ///   belongs to another event
    /// - `NotFound` if the event or guest does not exist
    /// - `Persistence` if the transaction fails
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn generate(
        &self,
        event_id: EventId,
        guest_id: GuestId,
        accompanying_guests_count: u32,
        actor: &Actor,
    ) -> Result<Generated> {
        let max = self.env.settings.max_accompanying_guests;
        if accompanying_guests_count > max {
            return Err(GuestlistError::Validation(format!(
                "at most {max} accompanying guests are allowed"
            )));
        }
        self.require_event(event_id).await?;

        let now = self.env.clock.now();
        let mut tx = self.env.repository.begin().await?;
        let guest = tx.lock_guest(guest_id).await?.ok_or(GuestlistError::not_found("guest"))?;
        if guest.event_id != event_id {
            return Err(GuestlistError::Validation("guest belongs to another event".into()));
        }
        if let Some(existing) = tx.lock_invitation_for_guest(guest_id, event_id).await? {
            return Ok(Generated { invitation: existing, created: false });
        }

        let invitation =
            Invitation::issue(guest_id, event_id, accompanying_guests_count, &TokenIssuer, now);
        let ctx = AuditContext::by(Some(actor), event_id, now);
        match persist::insert_invitation(&mut tx, &invitation, &ctx).await {
            Ok(()) => {}
            // A concurrent request inserted it first.
            Err(GuestlistError::Conflict(_)) => {
                drop(tx);
                return self.existing(guest_id, event_id).await;
            }
            Err(error) => return Err(error),
        }
        tx.commit().await?;

        tracing::info!(invitation_id = %invitation.id, guest_id = %guest_id, "Invitation generated");
        Ok(Generated { invitation, created: true })
    }

    /// Registers a walk-in: a new guest with an accepted invitation and
    /// party, optionally marked present, all in one transaction.
    ///
    /// # Errors
    ///
    /// - `Validation` if the name is blank or the party is too large
    /// - `NotFound` if the event does not exist
    /// - `Persistence` if the transaction fails
    #[tracing::instrument(skip(self, walk_in, actor), fields(user_id = %actor.user_id))]
    pub async fn quick_add(
        &self,
        event_id: EventId,
        walk_in: WalkIn,
        actor: &Actor,
    ) -> Result<InvitationDetails> {
        let name = walk_in.name.trim();
        if name.is_empty() {
            return Err(GuestlistError::Validation("name is required".into()));
        }
        self.require_event(event_id).await?;

        let now = self.env.clock.now();
        let guest = Guest {
            id: GuestId::new(),
            event_id,
            name: name.to_owned(),
            email: walk_in.email,
            phone: walk_in.phone,
            organization: walk_in.organization,
            status: GuestStatus::Invited,
            check_in_token: None,
            additional_data: AttributeBag::new(),
            table_number: None,
            created_at: now,
            updated_at: now,
        };
        let invitation = Invitation::issue(guest.id, event_id, 0, &TokenIssuer, now);
        let mut state = RsvpState { invitation, guest, accompanying: Vec::new() };

        let party = PartyDeclaration {
            count: walk_in.accompanying_guests_count,
            members: walk_in.accompanying_guests,
        };
        self.reducer.reduce(&mut state, RsvpCommand::Accept(party), now)?;
        if walk_in.check_in_now {
            state.guest.additional_data.mark_present(now);
        }

        let ctx = AuditContext::by(Some(actor), event_id, now);
        let mut tx = self.env.repository.begin().await?;
        persist::insert_guest(&mut tx, &state.guest, &ctx).await?;
        persist::insert_invitation(&mut tx, &state.invitation, &ctx).await?;
        for companion in &state.accompanying {
            persist::insert_companion(&mut tx, companion, &ctx).await?;
        }
        tx.commit().await?;

        tracing::info!(
            guest_id = %state.guest.id,
            party = state.accompanying.len(),
            checked_in = walk_in.check_in_now,
            "Walk-in registered"
        );
        Ok(InvitationDetails {
            invitation: state.invitation,
            guest: state.guest,
            accompanying_guests: state.accompanying,
        })
    }

    /// Loads an invitation with its guest and party.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the invitation or its guest does not exist
    /// - `Persistence` if a query fails
    pub async fn details(&self, invitation_id: InvitationId) -> Result<InvitationDetails> {
        let repo = &self.env.repository;
        let invitation = repo
            .find_invitation(invitation_id)
            .await?
            .ok_or(GuestlistError::not_found("invitation"))?;
        let guest = repo
            .find_guest(invitation.guest_id)
            .await?
            .ok_or(GuestlistError::not_found("guest"))?;
        let accompanying_guests = repo.list_accompanying(invitation_id).await?;
        Ok(InvitationDetails { invitation, guest, accompanying_guests })
    }

    /// Records the first fetch of the tracking pixel.
    ///
    /// Returns `true` only when `openedAt` was set by this call. Unknown
    /// tokens are not an error.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the transaction fails.
    pub async fn track_open(&self, token: &TrackingToken) -> Result<bool> {
        let mut tx = self.env.repository.begin().await?;
        let Some(mut invitation) = tx.lock_invitation_by_tracking_token(token).await? else {
            return Ok(false);
        };
        if invitation.opened_at.is_some() {
            return Ok(false);
        }

        let now = self.env.clock.now();
        invitation.opened_at = Some(now);
        invitation.updated_at = now;
        tx.update_invitation(&invitation).await?;
        tx.commit().await?;

        tracing::debug!(invitation_id = %invitation.id, "Invitation opened");
        Ok(true)
    }

    /// Event an invitation belongs to.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the invitation does not exist
    /// - `Persistence` if the query fails
    pub async fn invitation_event(&self, invitation_id: InvitationId) -> Result<EventId> {
        self.env
            .repository
            .find_invitation(invitation_id)
            .await?
            .map(|i| i.event_id)
            .ok_or(GuestlistError::not_found("invitation"))
    }

    /// Event a guest belongs to.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the guest does not exist
    /// - `Persistence` if the query fails
    pub async fn guest_event(&self, guest_id: GuestId) -> Result<EventId> {
        self.env
            .repository
            .find_guest(guest_id)
            .await?
            .map(|g| g.event_id)
            .ok_or(GuestlistError::not_found("guest"))
    }

    async fn existing(&self, guest_id: GuestId, event_id: EventId) -> Result<Generated> {
        let mut tx = self.env.repository.begin().await?;
        let invitation = tx
            .lock_invitation_for_guest(guest_id, event_id)
            .await?
            .ok_or_else(|| GuestlistError::Conflict("invitation is being created".into()))?;
        Ok(Generated { invitation, created: false })
    }

    async fn require_event(&self, event_id: EventId) -> Result<()> {
        self.env
            .repository
            .find_event(event_id)
            .await?
            .map(|_| ())
            .ok_or(GuestlistError::not_found("event"))
    }
}
