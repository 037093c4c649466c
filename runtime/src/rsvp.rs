//! RSVP service: the transactional shell around [`RsvpReducer`].
//!
//! Each operation opens a transaction, locks the invitation, its guest and
//! its accompanying guests (in that order), runs the reducer and writes the
//! diff with audit entries. A no-op outcome ("already accepted") releases
//! the locks without writing. Notifications go out after commit.

use guestlist_core::audit::AuditContext;
use guestlist_core::providers::{Notifier, Repository, RepositoryTx};
use guestlist_core::rsvp::{RsvpCommand, RsvpEffect, RsvpOutcome, RsvpReducer, RsvpState, Transition};
use guestlist_core::tokens::{AcceptToken, DeclineToken};
use guestlist_core::types::{
    Actor, InvitationDetails, InvitationId, InvitationPatch, PartyDeclaration, RsvpResponse,
};
use guestlist_core::{GuestlistError, Result};

use crate::environment::GuestlistEnvironment;
use crate::messages;
use crate::metrics::RsvpMetrics;
use crate::persist;

/// Result of a token-based RSVP.
#[derive(Clone, Debug, PartialEq)]
pub struct RsvpReceipt {
    /// What happened.
    pub outcome: RsvpOutcome,
    /// The invitation after the operation.
    pub details: InvitationDetails,
}

impl RsvpReceipt {
    /// `true` if the invitation already had the requested answer.
    #[must_use]
    pub const fn already(&self) -> bool {
        self.outcome.is_already()
    }
}

enum Target<'a> {
    AcceptToken(&'a AcceptToken),
    DeclineToken(&'a DeclineToken),
    Id(InvitationId),
}

/// Accept, decline and organizer-side RSVP edits.
#[derive(Clone)]
pub struct RsvpService<R, N> {
    env: GuestlistEnvironment<R, N>,
    reducer: RsvpReducer,
}

impl<R, N> RsvpService<R, N>
where
    R: Repository,
    N: Notifier + Clone + 'static,
{
    /// Creates the service.
    #[must_use]
    pub fn new(env: GuestlistEnvironment<R, N>) -> Self {
        let reducer = RsvpReducer::new(env.settings.clone());
        Self { env, reducer }
    }

    /// Accepts through the accept link.
    ///
    /// Accepting an already accepted invitation succeeds with
    /// [`RsvpOutcome::AlreadyAccepted`] and changes nothing.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no invitation carries the token
    /// - `Validation` if the party declaration is inconsistent or too large
    /// - `Persistence` if the transaction fails
    #[tracing::instrument(skip_all)]
    pub async fn accept(&self, token: &AcceptToken, party: PartyDeclaration) -> Result<RsvpReceipt> {
        let (state, transition) =
            self.run(Target::AcceptToken(token), RsvpCommand::Accept(party), None).await?;
        Ok(self.finish(state, transition).await)
    }

    /// Declines through the decline link.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no invitation carries the token
    /// - `Persistence` if the transaction fails
    #[tracing::instrument(skip_all)]
    pub async fn decline(&self, token: &DeclineToken) -> Result<RsvpReceipt> {
        let (state, transition) =
            self.run(Target::DeclineToken(token), RsvpCommand::Decline, None).await?;
        Ok(self.finish(state, transition).await)
    }

    /// Accepts a pending invitation on the guest's behalf, for a party of one.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the invitation does not exist
    /// - `Conflict` if it is not `PENDING`
    /// - `Persistence` if the transaction fails
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn accept_on_behalf(
        &self,
        invitation_id: InvitationId,
        actor: &Actor,
    ) -> Result<InvitationDetails> {
        let (state, transition) = self
            .run(Target::Id(invitation_id), RsvpCommand::AcceptOnBehalf, Some(actor))
            .await?;
        Ok(self.finish(state, transition).await.details)
    }

    /// Applies an organizer's direct edit.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the invitation does not exist
    /// - `Validation` if the new party size is too large
    /// - `Persistence` if the transaction fails
    #[tracing::instrument(skip(self, patch, actor), fields(user_id = %actor.user_id))]
    pub async fn manual_update(
        &self,
        invitation_id: InvitationId,
        patch: InvitationPatch,
        actor: &Actor,
    ) -> Result<InvitationDetails> {
        let (state, transition) = self
            .run(Target::Id(invitation_id), RsvpCommand::ManualUpdate(patch), Some(actor))
            .await?;
        Ok(self.finish(state, transition).await.details)
    }

    /// Replaces every token of the invitation and its party.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the invitation does not exist
    /// - `Persistence` if the transaction fails
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn regenerate_tokens(
        &self,
        invitation_id: InvitationId,
        actor: &Actor,
    ) -> Result<InvitationDetails> {
        let (state, transition) = self
            .run(Target::Id(invitation_id), RsvpCommand::RegenerateTokens, Some(actor))
            .await?;
        Ok(self.finish(state, transition).await.details)
    }

    async fn run(
        &self,
        target: Target<'_>,
        command: RsvpCommand,
        actor: Option<&Actor>,
    ) -> Result<(RsvpState, Transition)> {
        let mut tx = self.env.repository.begin().await?;

        let invitation = match target {
            Target::AcceptToken(token) => tx.lock_invitation_by_accept_token(token).await?,
            Target::DeclineToken(token) => tx.lock_invitation_by_decline_token(token).await?,
            Target::Id(id) => tx.lock_invitation(id).await?,
        }
        .ok_or(GuestlistError::not_found("invitation"))?;
        let guest = tx
            .lock_guest(invitation.guest_id)
            .await?
            .ok_or(GuestlistError::not_found("guest"))?;
        let accompanying = tx.lock_accompanying_for_invitation(invitation.id).await?;

        let mut state = RsvpState { invitation, guest, accompanying };
        let before = state.clone();
        let now = self.env.clock.now();
        let transition = self.reducer.reduce(&mut state, command, now)?;

        if state != before {
            let ctx = AuditContext::by(actor, state.invitation.event_id, now);
            persist::write_rsvp_diff(&mut tx, &before, &mut state, &ctx).await?;
            tx.commit().await?;
        }

        RsvpMetrics::record(transition.outcome);
        tracing::info!(
            invitation_id = %state.invitation.id,
            outcome = ?transition.outcome,
            response = %state.invitation.response,
            "RSVP processed"
        );
        Ok((state, transition))
    }

    async fn finish(&self, state: RsvpState, transition: Transition) -> RsvpReceipt {
        for effect in &transition.effects {
            match effect {
                RsvpEffect::AnnounceResponse(response) => self.announce(&state, *response).await,
            }
        }
        RsvpReceipt {
            outcome: transition.outcome,
            details: InvitationDetails {
                invitation: state.invitation,
                guest: state.guest,
                accompanying_guests: state.accompanying,
            },
        }
    }

    async fn announce(&self, state: &RsvpState, response: RsvpResponse) {
        let event_id = state.invitation.event_id;
        let event = self
            .env
            .repository
            .find_event(event_id)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Event lookup for notification failed"))
            .ok()
            .flatten();
        let counts = self
            .env
            .repository
            .response_counts(event_id)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Response counts for notification failed"))
            .ok();

        let notification = messages::rsvp_received(
            &self.env.public_base_url,
            event_id,
            event.as_ref(),
            &state.guest.name,
            response,
            counts,
        );
        self.env.dispatcher.dispatch(notification).await;
    }
}
