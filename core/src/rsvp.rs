//! RSVP state machine.
//!
//! The reducer decides every transition of an invitation and the matching
//! changes to its guest and accompanying guests. It is pure: callers load
//! and lock the rows, call [`RsvpReducer::reduce`], then persist whatever
//! changed and run the returned effects after commit.
//!
//! # Transitions
//!
//! ```text
//!              accept                 decline
//!   PENDING ───────────► ACCEPTED ◄───────────► DECLINED
//!      │                    ▲          accept      ▲
//!      └────────────────────┼──────────────────────┘
//!                           │          decline
//!   accept-on-behalf (PENDING only)
//! ```
//!
//! Accepting an already accepted invitation (or declining a declined one)
//! is reported as "already" and changes nothing. The manual update may move
//! an invitation anywhere, including back to `PENDING`.
//!
//! # Invariants
//!
//! - The guest holds a check-in token iff the invitation is `ACCEPTED`.
//! - The guest status mirrors the response (`INVITED`, `CONFIRMED`,
//!   `CANCELLED`).
//! - A decline rotates every accompanying guest's check-in token so that
//!   previously issued passes stop working.
//! - An invitation never has more accompanying guests than
//!   `accompanyingGuestsCount`; seating a smaller party removes the surplus.

use chrono::{DateTime, Utc};

use crate::error::{GuestlistError, Result};
use crate::settings::RsvpSettings;
use crate::tokens::TokenIssuer;
use crate::types::{
    AccompanyingGuest, AccompanyingGuestId, Guest, GuestStatus, Invitation, InvitationPatch,
    PartyDeclaration, PartyMember, RsvpResponse,
};

/// Everything one RSVP transition may touch, loaded under lock.
#[derive(Clone, Debug, PartialEq)]
pub struct RsvpState {
    /// The invitation being answered.
    pub invitation: Invitation,
    /// Its guest.
    pub guest: Guest,
    /// Its accompanying guests, oldest first. New rows are appended.
    pub accompanying: Vec<AccompanyingGuest>,
}

impl RsvpState {
    /// `true` if guest status and check-in token agree with the response.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let expected_status = match self.invitation.response {
            RsvpResponse::Pending => GuestStatus::Invited,
            RsvpResponse::Accepted => GuestStatus::Confirmed,
            RsvpResponse::Declined => GuestStatus::Cancelled,
        };
        self.guest.status == expected_status
            && self.guest.check_in_token.is_some()
                == (self.invitation.response == RsvpResponse::Accepted)
    }
}

/// Inputs to the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RsvpCommand {
    /// Guest accepted through the accept link.
    Accept(PartyDeclaration),
    /// Guest declined through the decline link.
    Decline,
    /// Organizer accepted a pending invitation for a party of one.
    AcceptOnBehalf,
    /// Organizer edited the invitation directly.
    ManualUpdate(InvitationPatch),
    /// Organizer invalidated every token of the invitation.
    RegenerateTokens,
}

/// What a command did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsvpOutcome {
    /// Moved to `ACCEPTED`.
    Accepted,
    /// Moved to `DECLINED`.
    Declined,
    /// Was already `ACCEPTED`; nothing changed.
    AlreadyAccepted,
    /// Was already `DECLINED`; nothing changed.
    AlreadyDeclined,
    /// Manual edit applied.
    Updated,
    /// Tokens replaced.
    TokensRegenerated,
}

impl RsvpOutcome {
    /// `true` for the idempotent no-op outcomes.
    #[must_use]
    pub const fn is_already(self) -> bool {
        matches!(self, Self::AlreadyAccepted | Self::AlreadyDeclined)
    }
}

/// Side effects to run after the transaction commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RsvpEffect {
    /// Tell the organizers a guest answered.
    AnnounceResponse(RsvpResponse),
}

/// Result of a successful reduction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// What happened.
    pub outcome: RsvpOutcome,
    /// Post-commit effects.
    pub effects: Vec<RsvpEffect>,
}

impl Transition {
    const fn quiet(outcome: RsvpOutcome) -> Self {
        Self { outcome, effects: Vec::new() }
    }

    fn announced(outcome: RsvpOutcome, response: RsvpResponse) -> Self {
        Self { outcome, effects: vec![RsvpEffect::AnnounceResponse(response)] }
    }
}

/// The RSVP reducer.
#[derive(Clone, Debug, Default)]
pub struct RsvpReducer {
    settings: RsvpSettings,
    issuer: TokenIssuer,
}

impl RsvpReducer {
    /// Creates a reducer with the given limits.
    #[must_use]
    pub const fn new(settings: RsvpSettings) -> Self {
        Self { settings, issuer: TokenIssuer }
    }

    /// Limits in effect.
    #[must_use]
    pub const fn settings(&self) -> &RsvpSettings {
        &self.settings
    }

    /// Applies `command` to `state`.
    ///
    /// On error `state` is left untouched.
    ///
    /// # Errors
    ///
    /// - `Validation` if a declared party is inconsistent or too large
    /// - `Conflict` if accept-on-behalf targets an answered invitation
    pub fn reduce(
        &self,
        state: &mut RsvpState,
        command: RsvpCommand,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        match command {
            RsvpCommand::Accept(party) => self.accept(state, &party, now),
            RsvpCommand::Decline => Ok(self.decline(state, now)),
            RsvpCommand::AcceptOnBehalf => self.accept_on_behalf(state, now),
            RsvpCommand::ManualUpdate(patch) => self.manual_update(state, &patch, now),
            RsvpCommand::RegenerateTokens => Ok(self.regenerate_tokens(state)),
        }
    }

    fn accept(
        &self,
        state: &mut RsvpState,
        party: &PartyDeclaration,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        if state.invitation.response == RsvpResponse::Accepted {
            return Ok(Transition::quiet(RsvpOutcome::AlreadyAccepted));
        }

        let declared = self.declared_party_size(&state.invitation, party)?;
        state.invitation.accompanying_guests_count = declared;
        self.record_acceptance(state, now);
        self.seat_party(state, &party.members, declared, now);

        Ok(Transition::announced(RsvpOutcome::Accepted, RsvpResponse::Accepted))
    }

    fn decline(&self, state: &mut RsvpState, now: DateTime<Utc>) -> Transition {
        if state.invitation.response == RsvpResponse::Declined {
            return Transition::quiet(RsvpOutcome::AlreadyDeclined);
        }

        self.record_decline(state, now);
        Transition::announced(RsvpOutcome::Declined, RsvpResponse::Declined)
    }

    fn accept_on_behalf(&self, state: &mut RsvpState, now: DateTime<Utc>) -> Result<Transition> {
        let current = state.invitation.response;
        if current != RsvpResponse::Pending {
            return Err(GuestlistError::Conflict(format!(
                "invitation already has response {current}"
            )));
        }

        state.invitation.accompanying_guests_count = 0;
        state.accompanying.clear();
        self.record_acceptance(state, now);
        Ok(Transition::quiet(RsvpOutcome::Accepted))
    }

    fn manual_update(
        &self,
        state: &mut RsvpState,
        patch: &InvitationPatch,
        now: DateTime<Utc>,
    ) -> Result<Transition> {
        if let Some(count) = patch.accompanying_guests_count {
            self.check_party_limit(count)?;
            state.invitation.accompanying_guests_count = count;
            state.accompanying.truncate(count as usize);
        }

        let previous = state.invitation.response;
        if let Some(target) = patch.response.filter(|target| *target != previous) {
            if previous.is_terminal() {
                tracing::warn!(
                    invitation_id = %state.invitation.id,
                    from = %previous,
                    to = %target,
                    "Manual update overrides a recorded RSVP"
                );
            }
            match target {
                RsvpResponse::Accepted => self.record_acceptance(state, now),
                RsvpResponse::Declined => self.record_decline(state, now),
                RsvpResponse::Pending => reopen(state),
            }
        }

        let invitation = &mut state.invitation;
        if let Some(responded_at) = patch.responded_at {
            invitation.responded_at = responded_at;
        }
        if let Some(sent_at) = patch.sent_at {
            invitation.sent_at = sent_at;
        }
        if let Some(email_sent_at) = patch.email_sent_at {
            invitation.email_sent_at = email_sent_at;
        }
        if let Some(whatsapp_sent_at) = patch.whatsapp_sent_at {
            invitation.whatsapp_sent_at = whatsapp_sent_at;
        }

        Ok(Transition::quiet(RsvpOutcome::Updated))
    }

    fn regenerate_tokens(&self, state: &mut RsvpState) -> Transition {
        let invitation = &mut state.invitation;
        invitation.accept_token = self.issuer.issue();
        invitation.decline_token = self.issuer.issue();
        invitation.tracking_token = self.issuer.issue();

        let accepted = invitation.response == RsvpResponse::Accepted;
        if state.guest.check_in_token.is_some() || accepted {
            state.guest.check_in_token = Some(self.issuer.issue());
        }
        self.rotate_party_tokens(state);

        Transition::quiet(RsvpOutcome::TokensRegenerated)
    }

    fn declared_party_size(&self, invitation: &Invitation, party: &PartyDeclaration) -> Result<u32> {
        let named = u32::try_from(party.members.len())
            .map_err(|_| GuestlistError::Validation("too many accompanying guests".into()))?;
        let declared = party.count.unwrap_or(if named == 0 {
            invitation.accompanying_guests_count
        } else {
            named
        });

        if named > declared {
            return Err(GuestlistError::Validation(format!(
                "{named} accompanying guests named but only {declared} declared"
            )));
        }
        self.check_party_limit(declared)?;
        Ok(declared)
    }

    fn check_party_limit(&self, count: u32) -> Result<()> {
        let max = self.settings.max_accompanying_guests;
        if count > max {
            return Err(GuestlistError::Validation(format!(
                "at most {max} accompanying guests allowed, got {count}"
            )));
        }
        Ok(())
    }

    fn record_acceptance(&self, state: &mut RsvpState, now: DateTime<Utc>) {
        state.invitation.response = RsvpResponse::Accepted;
        state.invitation.responded_at = Some(now);
        state.guest.additional_data.mark_accepted(now);
        state.guest.status = GuestStatus::Confirmed;
        if state.guest.check_in_token.is_none() {
            state.guest.check_in_token = Some(self.issuer.issue());
        }
    }

    fn record_decline(&self, state: &mut RsvpState, now: DateTime<Utc>) {
        state.invitation.response = RsvpResponse::Declined;
        state.invitation.responded_at = Some(now);
        state.guest.additional_data.mark_declined(now);
        state.guest.status = GuestStatus::Cancelled;
        state.guest.check_in_token = None;
        self.rotate_party_tokens(state);
    }

    fn rotate_party_tokens(&self, state: &mut RsvpState) {
        for companion in &mut state.accompanying {
            companion.check_in_token = self.issuer.issue();
        }
    }

    /// Renames existing companions from `members`, then appends or drops
    /// rows until the party has exactly `declared` seats.
    fn seat_party(
        &self,
        state: &mut RsvpState,
        members: &[PartyMember],
        declared: u32,
        now: DateTime<Utc>,
    ) {
        for (companion, member) in state.accompanying.iter_mut().zip(members) {
            apply_member(companion, member);
        }

        let host = state.guest.name.clone();
        let seats = declared as usize;
        state.accompanying.truncate(seats);
        for seat in state.accompanying.len()..seats {
            let mut companion = AccompanyingGuest {
                id: AccompanyingGuestId::new(),
                invitation_id: state.invitation.id,
                first_name: format!("Begleitung {}", seat + 1),
                last_name: host.clone(),
                funktion: None,
                email: None,
                check_in_token: self.issuer.issue(),
                arrived_at: None,
                created_at: now,
            };
            if let Some(member) = members.get(seat) {
                apply_member(&mut companion, member);
            }
            state.accompanying.push(companion);
        }
    }
}

fn apply_member(companion: &mut AccompanyingGuest, member: &PartyMember) {
    if member.first_name.trim().is_empty() && member.last_name.trim().is_empty() {
        return;
    }
    companion.first_name = member.first_name.trim().to_owned();
    companion.last_name = member.last_name.trim().to_owned();
    companion.funktion.clone_from(&member.funktion);
    companion.email.clone_from(&member.email);
}

fn reopen(state: &mut RsvpState) {
    state.invitation.response = RsvpResponse::Pending;
    state.invitation.responded_at = None;
    state.guest.status = GuestStatus::Invited;
    state.guest.check_in_token = None;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::attributes::{AttributeBag, keys};
    use crate::types::{EventId, GuestId};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn pending_state(count: u32) -> RsvpState {
        let event_id = EventId::new();
        let guest = Guest {
            id: GuestId::new(),
            event_id,
            name: "Grace Hopper".into(),
            email: None,
            phone: None,
            organization: None,
            status: GuestStatus::Invited,
            check_in_token: None,
            additional_data: AttributeBag::new(),
            table_number: None,
            created_at: now(),
            updated_at: now(),
        };
        let invitation = Invitation::issue(guest.id, event_id, count, &TokenIssuer, now());
        RsvpState { invitation, guest, accompanying: Vec::new() }
    }

    #[test]
    fn accept_seats_placeholders_for_unnamed_members() {
        let reducer = RsvpReducer::default();
        let mut state = pending_state(2);

        let transition = reducer
            .reduce(&mut state, RsvpCommand::Accept(PartyDeclaration::default()), now())
            .unwrap();

        assert_eq!(transition.outcome, RsvpOutcome::Accepted);
        assert_eq!(state.accompanying.len(), 2);
        assert_eq!(state.accompanying[0].first_name, "Begleitung 1");
        assert_eq!(state.accompanying[1].last_name, "Grace Hopper");
        assert!(state.is_consistent());
        assert!(state.guest.additional_data.flag(keys::ACCEPTED));
    }

    #[test]
    fn invalid_party_leaves_state_untouched() {
        let reducer = RsvpReducer::default();
        let mut state = pending_state(0);
        let before = state.clone();

        let party = PartyDeclaration {
            count: Some(1),
            members: vec![PartyMember::default(), PartyMember::default()],
        };
        let err = reducer.reduce(&mut state, RsvpCommand::Accept(party), now()).unwrap_err();

        assert!(matches!(err, GuestlistError::Validation(_)));
        assert_eq!(state, before);
    }

    #[test]
    fn accept_on_behalf_seats_only_the_guest() {
        let reducer = RsvpReducer::default();
        let mut state = pending_state(2);
        reducer.reduce(&mut state, RsvpCommand::Accept(PartyDeclaration::default()), now()).unwrap();
        reopen(&mut state);

        reducer.reduce(&mut state, RsvpCommand::AcceptOnBehalf, now()).unwrap();

        assert_eq!(state.invitation.accompanying_guests_count, 0);
        assert!(state.accompanying.is_empty());
        assert!(state.is_consistent());
    }

    #[test]
    fn smaller_party_after_decline_drops_surplus_seats() {
        let reducer = RsvpReducer::default();
        let mut state = pending_state(3);
        reducer.reduce(&mut state, RsvpCommand::Accept(PartyDeclaration::default()), now()).unwrap();
        reducer.reduce(&mut state, RsvpCommand::Decline, now()).unwrap();
        let kept = state.accompanying[0].id;

        let party = PartyDeclaration { count: Some(1), members: Vec::new() };
        reducer.reduce(&mut state, RsvpCommand::Accept(party), now()).unwrap();

        assert_eq!(state.invitation.accompanying_guests_count, 1);
        assert_eq!(state.accompanying.len(), 1);
        assert_eq!(state.accompanying[0].id, kept);
    }

    #[test]
    fn lowering_the_count_manually_drops_surplus_seats() {
        let reducer = RsvpReducer::default();
        let mut state = pending_state(2);
        reducer.reduce(&mut state, RsvpCommand::Accept(PartyDeclaration::default()), now()).unwrap();

        let patch = InvitationPatch { accompanying_guests_count: Some(1), ..InvitationPatch::default() };
        reducer.reduce(&mut state, RsvpCommand::ManualUpdate(patch), now()).unwrap();

        assert_eq!(state.accompanying.len(), 1);
    }

    #[test]
    fn regenerate_keeps_pending_guest_without_pass() {
        let reducer = RsvpReducer::default();
        let mut state = pending_state(0);
        let old_accept = state.invitation.accept_token.clone();

        reducer.reduce(&mut state, RsvpCommand::RegenerateTokens, now()).unwrap();

        assert_ne!(state.invitation.accept_token, old_accept);
        assert!(state.guest.check_in_token.is_none());
    }
}
