//! Transition tests for the RSVP reducer.

#![allow(clippy::unwrap_used)]

use guestlist_core::GuestlistError;
use guestlist_core::attributes::keys;
use guestlist_core::rsvp::{RsvpCommand, RsvpEffect, RsvpOutcome, RsvpReducer, RsvpState};
use guestlist_core::settings::RsvpSettings;
use guestlist_core::types::{
    GuestStatus, InvitationPatch, PartyDeclaration, PartyMember, RsvpResponse,
};
use guestlist_testing::properties::arb_command;
use guestlist_testing::{TransitionTest, fixtures, test_epoch};
use proptest::prelude::*;

fn accepted_state(accompanying: u32) -> RsvpState {
    let mut state = fixtures::pending_state(accompanying);
    RsvpReducer::default()
        .reduce(&mut state, RsvpCommand::Accept(PartyDeclaration::default()), test_epoch())
        .unwrap();
    state
}

fn declined_state() -> RsvpState {
    let mut state = fixtures::pending_state(0);
    RsvpReducer::default().reduce(&mut state, RsvpCommand::Decline, test_epoch()).unwrap();
    state
}

fn member(first: &str, last: &str) -> PartyMember {
    PartyMember { first_name: first.into(), last_name: last.into(), ..PartyMember::default() }
}

// ═══════════════════════════════════════════════════════════
// Accept
// ═══════════════════════════════════════════════════════════

#[test]
fn accept_pending_confirms_guest_and_mints_pass() {
    TransitionTest::new(RsvpReducer::default())
        .given_state(fixtures::pending_state(0))
        .when_command(RsvpCommand::Accept(PartyDeclaration {
            count: Some(2),
            members: vec![member("Ada", "Lovelace")],
        }))
        .then_transition(|t| {
            assert_eq!(t.outcome, RsvpOutcome::Accepted);
            assert_eq!(t.effects, vec![RsvpEffect::AnnounceResponse(RsvpResponse::Accepted)]);
        })
        .then_state(|s| {
            assert_eq!(s.invitation.response, RsvpResponse::Accepted);
            assert_eq!(s.invitation.responded_at, Some(test_epoch()));
            assert_eq!(s.invitation.accompanying_guests_count, 2);
            assert_eq!(s.guest.status, GuestStatus::Confirmed);
            assert!(s.guest.check_in_token.is_some());
            assert!(s.guest.additional_data.flag(keys::ACCEPTED));
            assert!(!s.guest.additional_data.flag(keys::DECLINED));
            assert_eq!(s.guest.additional_data.timestamp(keys::ACCEPTED_AT), Some(test_epoch()));
            assert_eq!(s.accompanying.len(), 2);
            assert_eq!(s.accompanying[0].display_name(), "Ada Lovelace");
            assert_ne!(s.accompanying[0].check_in_token, s.accompanying[1].check_in_token);
        })
        .run();
}

#[test]
fn accept_twice_reports_already_and_changes_nothing() {
    let state = accepted_state(1);
    let snapshot = state.clone();

    TransitionTest::new(RsvpReducer::default())
        .given_state(state)
        .when_command(RsvpCommand::Accept(PartyDeclaration { count: Some(5), members: vec![] }))
        .then_transition(|t| {
            assert_eq!(t.outcome, RsvpOutcome::AlreadyAccepted);
            assert!(t.effects.is_empty());
        })
        .then_state(move |s| assert_eq!(s, &snapshot))
        .run();
}

#[test]
fn accept_after_decline_keeps_existing_party_rows() {
    let mut state = accepted_state(2);
    let reducer = RsvpReducer::default();
    reducer.reduce(&mut state, RsvpCommand::Decline, test_epoch()).unwrap();
    let existing: Vec<_> = state.accompanying.iter().map(|a| a.id).collect();

    TransitionTest::new(reducer)
        .given_state(state)
        .when_command(RsvpCommand::Accept(PartyDeclaration { count: Some(3), members: vec![] }))
        .then_state(move |s| {
            assert_eq!(s.accompanying.len(), 3);
            assert_eq!(s.accompanying[0].id, existing[0]);
            assert_eq!(s.accompanying[1].id, existing[1]);
            assert!(s.is_consistent());
        })
        .run();
}

#[test]
fn accept_rejects_more_names_than_seats() {
    TransitionTest::new(RsvpReducer::default())
        .given_state(fixtures::pending_state(0))
        .when_command(RsvpCommand::Accept(PartyDeclaration {
            count: Some(1),
            members: vec![member("A", "B"), member("C", "D")],
        }))
        .then_error(|e| assert!(matches!(e, GuestlistError::Validation(_))))
        .run();
}

#[test]
fn accept_rejects_party_above_limit() {
    let reducer = RsvpReducer::new(RsvpSettings::default().with_max_accompanying_guests(2));

    TransitionTest::new(reducer)
        .given_state(fixtures::pending_state(0))
        .when_command(RsvpCommand::Accept(PartyDeclaration { count: Some(3), members: vec![] }))
        .then_error(|e| {
            assert_eq!(
                e,
                &GuestlistError::Validation("at most 2 accompanying guests allowed, got 3".into())
            );
        })
        .run();
}

#[test]
fn accept_without_count_uses_named_members() {
    TransitionTest::new(RsvpReducer::default())
        .given_state(fixtures::pending_state(4))
        .when_command(RsvpCommand::Accept(PartyDeclaration {
            count: None,
            members: vec![member("Ada", "Lovelace")],
        }))
        .then_state(|s| {
            assert_eq!(s.invitation.accompanying_guests_count, 1);
            assert_eq!(s.accompanying.len(), 1);
        })
        .run();
}

// ═══════════════════════════════════════════════════════════
// Decline
// ═══════════════════════════════════════════════════════════

#[test]
fn decline_after_accept_revokes_every_pass() {
    let state = accepted_state(2);
    let old_tokens: Vec<_> = state.accompanying.iter().map(|a| a.check_in_token.clone()).collect();

    TransitionTest::new(RsvpReducer::default())
        .given_state(state)
        .when_command(RsvpCommand::Decline)
        .then_transition(|t| {
            assert_eq!(t.outcome, RsvpOutcome::Declined);
            assert_eq!(t.effects, vec![RsvpEffect::AnnounceResponse(RsvpResponse::Declined)]);
        })
        .then_state(move |s| {
            assert_eq!(s.guest.status, GuestStatus::Cancelled);
            assert!(s.guest.check_in_token.is_none());
            assert!(s.guest.additional_data.flag(keys::DECLINED));
            assert!(!s.guest.additional_data.flag(keys::ACCEPTED));
            for (companion, old) in s.accompanying.iter().zip(&old_tokens) {
                assert_ne!(&companion.check_in_token, old);
            }
        })
        .run();
}

#[test]
fn decline_twice_reports_already() {
    TransitionTest::new(RsvpReducer::default())
        .given_state(declined_state())
        .when_command(RsvpCommand::Decline)
        .then_transition(|t| {
            assert_eq!(t.outcome, RsvpOutcome::AlreadyDeclined);
            assert!(t.outcome.is_already());
            assert!(t.effects.is_empty());
        })
        .run();
}

// ═══════════════════════════════════════════════════════════
// Accept on behalf
// ═══════════════════════════════════════════════════════════

#[test]
fn accept_on_behalf_is_a_party_of_one() {
    TransitionTest::new(RsvpReducer::default())
        .given_state(fixtures::pending_state(3))
        .when_command(RsvpCommand::AcceptOnBehalf)
        .then_transition(|t| {
            assert_eq!(t.outcome, RsvpOutcome::Accepted);
            assert!(t.effects.is_empty());
        })
        .then_state(|s| {
            assert_eq!(s.invitation.accompanying_guests_count, 0);
            assert!(s.accompanying.is_empty());
            assert!(s.is_consistent());
        })
        .run();
}

#[test]
fn accept_on_behalf_refuses_answered_invitations() {
    TransitionTest::new(RsvpReducer::default())
        .given_state(declined_state())
        .when_command(RsvpCommand::AcceptOnBehalf)
        .then_error(|e| {
            assert_eq!(e, &GuestlistError::Conflict("invitation already has response DECLINED".into()));
        })
        .run();
}

// ═══════════════════════════════════════════════════════════
// Manual update
// ═══════════════════════════════════════════════════════════

#[test]
fn manual_update_to_pending_clears_pass_but_not_bag() {
    TransitionTest::new(RsvpReducer::default())
        .given_state(accepted_state(0))
        .when_command(RsvpCommand::ManualUpdate(InvitationPatch {
            response: Some(RsvpResponse::Pending),
            ..InvitationPatch::default()
        }))
        .then_transition(|t| assert_eq!(t.outcome, RsvpOutcome::Updated))
        .then_state(|s| {
            assert_eq!(s.invitation.response, RsvpResponse::Pending);
            assert_eq!(s.invitation.responded_at, None);
            assert_eq!(s.guest.status, GuestStatus::Invited);
            assert!(s.guest.check_in_token.is_none());
            assert!(s.guest.additional_data.flag(keys::ACCEPTED));
        })
        .run();
}

#[test]
fn manual_update_sets_and_clears_timestamps() {
    let later = test_epoch() + chrono::Duration::days(1);
    let mut state = fixtures::pending_state(0);
    state.invitation.email_sent_at = Some(test_epoch());

    TransitionTest::new(RsvpReducer::default())
        .given_state(state)
        .when_command(RsvpCommand::ManualUpdate(InvitationPatch {
            sent_at: Some(Some(later)),
            email_sent_at: Some(None),
            ..InvitationPatch::default()
        }))
        .then_state(move |s| {
            assert_eq!(s.invitation.sent_at, Some(later));
            assert_eq!(s.invitation.email_sent_at, None);
            assert_eq!(s.invitation.response, RsvpResponse::Pending);
        })
        .run();
}

#[test]
fn manual_update_into_accepted_mints_pass() {
    TransitionTest::new(RsvpReducer::default())
        .given_state(declined_state())
        .when_command(RsvpCommand::ManualUpdate(InvitationPatch {
            response: Some(RsvpResponse::Accepted),
            ..InvitationPatch::default()
        }))
        .then_state(|s| {
            assert!(s.guest.check_in_token.is_some());
            assert_eq!(s.guest.status, GuestStatus::Confirmed);
        })
        .run();
}

// ═══════════════════════════════════════════════════════════
// Regenerate tokens
// ═══════════════════════════════════════════════════════════

#[test]
fn regenerate_replaces_every_token_of_an_accepted_party() {
    let state = accepted_state(1);
    let before = state.clone();

    TransitionTest::new(RsvpReducer::default())
        .given_state(state)
        .when_command(RsvpCommand::RegenerateTokens)
        .then_transition(|t| assert_eq!(t.outcome, RsvpOutcome::TokensRegenerated))
        .then_state(move |s| {
            assert_ne!(s.invitation.accept_token, before.invitation.accept_token);
            assert_ne!(s.invitation.decline_token, before.invitation.decline_token);
            assert_ne!(s.invitation.tracking_token, before.invitation.tracking_token);
            assert!(s.guest.check_in_token.is_some());
            assert_ne!(s.guest.check_in_token, before.guest.check_in_token);
            assert_ne!(s.accompanying[0].check_in_token, before.accompanying[0].check_in_token);
        })
        .run();
}

#[test]
fn regenerate_repairs_missing_pass_on_accepted_invitation() {
    let mut state = accepted_state(0);
    state.guest.check_in_token = None;

    TransitionTest::new(RsvpReducer::default())
        .given_state(state)
        .when_command(RsvpCommand::RegenerateTokens)
        .then_state(|s| assert!(s.is_consistent()))
        .run();
}

// ═══════════════════════════════════════════════════════════
// Properties
// ═══════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn any_command_sequence_keeps_guest_in_sync(
        commands in proptest::collection::vec(arb_command(3), 1..12)
    ) {
        let reducer = RsvpReducer::new(RsvpSettings::default().with_max_accompanying_guests(3));
        let mut state = fixtures::pending_state(0);

        for command in commands {
            let before = state.clone();
            if reducer.reduce(&mut state, command, test_epoch()).is_err() {
                prop_assert_eq!(&state, &before);
            }
            prop_assert!(state.is_consistent());
            prop_assert!(state.invitation.accompanying_guests_count <= 3);
        }
    }
}
