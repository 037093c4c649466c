//! Integration tests for door check-in and the attendance toggle.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

mod common;

use chrono::Duration;
use common::Harness;
use guestlist_core::GuestlistError;
use guestlist_core::attributes::keys;
use guestlist_core::audit::AuditAction;
use guestlist_core::error::NotifyError;
use guestlist_core::tokens::{CheckInToken, TokenIssuer};
use guestlist_core::types::{GuestId, PartyDeclaration};
use guestlist_runtime::{CheckInKind, CheckInService, RevertEngine, RsvpService};
use guestlist_testing::fixtures::Seeded;

async fn accepted(h: &Harness, name: &str, party: u32) -> Seeded {
    let seeded = h.invite(name, 0).await;
    RsvpService::new(h.env.clone())
        .accept(
            &seeded.invitation.accept_token,
            PartyDeclaration { count: Some(party), members: Vec::new() },
        )
        .await
        .unwrap();
    seeded
}

async fn guest_token(h: &Harness, id: GuestId) -> CheckInToken {
    h.repo.guest(id).await.unwrap().check_in_token.unwrap()
}

#[tokio::test]
async fn main_guest_is_admitted_once() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 0).await;
    let desk = CheckInService::new(h.env.clone());
    let token = guest_token(&h, seeded.guest.id).await;
    let arrived = h.clock_now();

    let receipt = desk.check_in(&token).await.unwrap();

    assert_eq!(receipt.kind, CheckInKind::Guest);
    assert_eq!(receipt.name, "Ada Lovelace");
    assert_eq!(receipt.event_title.as_deref(), Some("Sommerfest"));
    assert!(!receipt.already_checked_in);
    assert_eq!(receipt.arrived_at, arrived);

    let guest = h.repo.guest(seeded.guest.id).await.unwrap();
    assert!(guest.additional_data.flag(keys::PRESENT));
    assert_eq!(guest.additional_data.timestamp(keys::PRESENT_AT), Some(arrived));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].title, "Ada Lovelace has arrived");
    assert_eq!(sent[1].body, "Checked in at Sommerfest");
}

#[tokio::test]
async fn rescanning_a_present_guest_writes_nothing() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 0).await;
    let desk = CheckInService::new(h.env.clone());
    let token = guest_token(&h, seeded.guest.id).await;
    let first = desk.check_in(&token).await.unwrap();
    let commits = h.repo.commit_count();
    h.clock.advance(Duration::minutes(30));

    let again = desk.check_in(&token).await.unwrap();

    assert!(again.already_checked_in);
    assert_eq!(again.arrived_at, first.arrived_at);
    assert_eq!(h.repo.commit_count(), commits);
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn companion_arrival_is_overwritten_on_reentry() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 1).await;
    let desk = CheckInService::new(h.env.clone());
    let companion = h.repo.party(seeded.invitation.id).await.remove(0);

    let receipt = desk.check_in(&companion.check_in_token).await.unwrap();

    assert_eq!(receipt.kind, CheckInKind::AccompanyingGuest);
    assert_eq!(receipt.name, "Begleitung 1 Ada Lovelace");
    assert!(!receipt.already_checked_in);
    let sent = h.notifier.sent();
    assert_eq!(sent.last().unwrap().body, "Checked in at Sommerfest (with Ada Lovelace)");

    h.clock.advance(Duration::hours(2));
    let again = desk.check_in(&companion.check_in_token).await.unwrap();

    assert!(again.already_checked_in);
    assert_eq!(again.arrived_at, h.clock_now());
    let stored = h.repo.party(seeded.invitation.id).await.remove(0);
    assert_eq!(stored.arrived_at, Some(h.clock_now()));
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn unknown_token_is_denied_without_writes() {
    let h = Harness::new().await;
    accepted(&h, "Ada Lovelace", 1).await;
    let desk = CheckInService::new(h.env.clone());
    let commits = h.repo.commit_count();
    let audit = h.repo.audit_log().await.len();

    let err = desk.check_in(&TokenIssuer.issue::<CheckInToken>()).await.unwrap_err();

    assert!(matches!(err, GuestlistError::NotFound { entity: "check-in token" }));
    assert_eq!(h.repo.commit_count(), commits);
    assert_eq!(h.repo.audit_log().await.len(), audit);
}

#[tokio::test]
async fn declined_guest_token_no_longer_admits() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 0).await;
    let token = guest_token(&h, seeded.guest.id).await;
    RsvpService::new(h.env.clone()).decline(&seeded.invitation.decline_token).await.unwrap();

    let result = CheckInService::new(h.env.clone()).check_in(&token).await;

    assert!(matches!(result, Err(GuestlistError::NotFound { .. })));
}

#[tokio::test]
async fn companion_of_a_reverted_invitation_is_denied() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 1).await;
    let companion = h.repo.party(seeded.invitation.id).await.remove(0);
    RevertEngine::new(h.env.clone()).revert_responses(h.event.id, &h.actor).await.unwrap();

    let result = CheckInService::new(h.env.clone()).check_in(&companion.check_in_token).await;

    assert!(result.is_err());
    assert_eq!(h.repo.party(seeded.invitation.id).await[0].arrived_at, None);
}

#[tokio::test]
async fn passes_from_before_a_revert_stay_dead_after_accept_on_behalf() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 2).await;
    let old_party = h.repo.party(seeded.invitation.id).await;
    RevertEngine::new(h.env.clone()).revert_responses(h.event.id, &h.actor).await.unwrap();

    RsvpService::new(h.env.clone())
        .accept_on_behalf(seeded.invitation.id, &h.actor)
        .await
        .unwrap();

    let invitation = h.repo.invitation(seeded.invitation.id).await.unwrap();
    assert_eq!(invitation.accompanying_guests_count, 0);
    assert!(h.repo.party(seeded.invitation.id).await.is_empty());
    let desk = CheckInService::new(h.env.clone());
    for companion in &old_party {
        let result = desk.check_in(&companion.check_in_token).await;
        assert!(matches!(result, Err(GuestlistError::NotFound { .. })));
    }
}

#[tokio::test]
async fn passes_from_before_a_revert_stay_dead_after_accepting_again() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 1).await;
    let old = h.repo.party(seeded.invitation.id).await.remove(0);
    RevertEngine::new(h.env.clone()).revert_responses(h.event.id, &h.actor).await.unwrap();
    RsvpService::new(h.env.clone())
        .accept(
            &seeded.invitation.accept_token,
            PartyDeclaration { count: Some(1), members: Vec::new() },
        )
        .await
        .unwrap();
    let desk = CheckInService::new(h.env.clone());

    let stale = desk.check_in(&old.check_in_token).await;
    assert!(matches!(stale, Err(GuestlistError::NotFound { .. })));

    let current = h.repo.party(seeded.invitation.id).await.remove(0);
    assert_eq!(current.id, old.id);
    assert!(desk.check_in(&current.check_in_token).await.is_ok());
}

#[tokio::test]
async fn smaller_party_after_decline_leaves_no_surplus_pass() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 2).await;
    let rsvp = RsvpService::new(h.env.clone());
    rsvp.decline(&seeded.invitation.decline_token).await.unwrap();
    let surplus = h.repo.party(seeded.invitation.id).await.remove(1);

    rsvp.accept(
        &seeded.invitation.accept_token,
        PartyDeclaration { count: Some(1), members: Vec::new() },
    )
    .await
    .unwrap();

    let party = h.repo.party(seeded.invitation.id).await;
    assert_eq!(party.len(), 1);
    assert!(party.iter().all(|c| c.id != surplus.id));
    let result = CheckInService::new(h.env.clone()).check_in(&surplus.check_in_token).await;
    assert!(matches!(result, Err(GuestlistError::NotFound { .. })));
    let log = h.repo.audit_log().await;
    assert!(log.iter().any(|e| e.entity_id == *surplus.id.as_uuid()
        && e.action == AuditAction::Delete
        && e.new_values.is_none()));
}

#[tokio::test]
async fn notification_failure_does_not_block_admission() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 0).await;
    let token = guest_token(&h, seeded.guest.id).await;
    h.notifier.fail_with(NotifyError::Timeout);

    let receipt = CheckInService::new(h.env.clone()).check_in(&token).await.unwrap();

    assert!(!receipt.already_checked_in);
    assert!(h.repo.guest(seeded.guest.id).await.unwrap().additional_data.flag(keys::PRESENT));
}

// ============================================================================
// Attendance toggle
// ============================================================================

#[tokio::test]
async fn toggle_and_scanner_agree_on_presence() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 0).await;
    let desk = CheckInService::new(h.env.clone());

    let guest = desk.set_attendance(seeded.guest.id, true, &h.actor).await.unwrap();
    assert!(guest.additional_data.flag(keys::PRESENT));

    let token = guest_token(&h, seeded.guest.id).await;
    let receipt = desk.check_in(&token).await.unwrap();
    assert!(receipt.already_checked_in);
}

#[tokio::test]
async fn unmarking_removes_the_arrival_date() {
    let h = Harness::new().await;
    let seeded = accepted(&h, "Ada Lovelace", 0).await;
    let desk = CheckInService::new(h.env.clone());
    desk.check_in(&guest_token(&h, seeded.guest.id).await).await.unwrap();

    let guest = desk.set_attendance(seeded.guest.id, false, &h.actor).await.unwrap();

    assert!(!guest.additional_data.flag(keys::PRESENT));
    assert_eq!(guest.additional_data.timestamp(keys::PRESENT_AT), None);
    let last = h.repo.audit_log().await.pop().unwrap();
    assert_eq!(last.user_id, Some(h.actor.user_id));
}

#[tokio::test]
async fn toggling_an_unknown_guest_is_not_found() {
    let h = Harness::new().await;
    let desk = CheckInService::new(h.env.clone());

    let err = desk.set_attendance(GuestId::new(), true, &h.actor).await.unwrap_err();

    assert!(matches!(err, GuestlistError::NotFound { entity: "guest" }));
}
