//! Row builders and repository seeding.

use chrono::{DateTime, Utc};
use guestlist_core::Result;
use guestlist_core::attributes::AttributeBag;
use guestlist_core::mocks::InMemoryRepository;
use guestlist_core::providers::{Repository, RepositoryTx};
use guestlist_core::rsvp::RsvpState;
use guestlist_core::tokens::TokenIssuer;
use guestlist_core::types::{Event, EventId, Guest, GuestId, GuestStatus, Invitation};

use crate::mocks::test_epoch;

/// An invited guest as stored.
#[derive(Debug, Clone)]
pub struct Seeded {
    /// The guest row.
    pub guest: Guest,
    /// The guest's `PENDING` invitation.
    pub invitation: Invitation,
}

/// An `INVITED` guest with an empty attribute bag.
#[must_use]
pub fn guest(event_id: EventId, name: &str, now: DateTime<Utc>) -> Guest {
    Guest {
        id: GuestId::new(),
        event_id,
        name: name.to_owned(),
        email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
        phone: None,
        organization: None,
        status: GuestStatus::Invited,
        check_in_token: None,
        additional_data: AttributeBag::new(),
        table_number: None,
        created_at: now,
        updated_at: now,
    }
}

/// A `PENDING` invitation for `guest`.
#[must_use]
pub fn invitation_for(guest: &Guest, accompanying: u32, now: DateTime<Utc>) -> Invitation {
    Invitation::issue(guest.id, guest.event_id, accompanying, &TokenIssuer, now)
}

/// Reducer state for a fresh `PENDING` invitation at the test epoch.
#[must_use]
pub fn pending_state(accompanying: u32) -> RsvpState {
    let guest = guest(EventId::new(), "Grace Hopper", test_epoch());
    let invitation = invitation_for(&guest, accompanying, test_epoch());
    RsvpState { invitation, guest, accompanying: Vec::new() }
}

/// Stores an event in the in-memory repository.
pub async fn seed_event(repo: &InMemoryRepository, title: &str) -> Event {
    let event = Event { id: EventId::new(), title: title.to_owned(), starts_at: None };
    repo.insert_event(event.clone()).await;
    event
}

/// Stores a guest with a `PENDING` invitation.
///
/// # Errors
///
/// Propagates repository failures.
pub async fn seed_invitation<R: Repository>(
    repo: &R,
    event_id: EventId,
    name: &str,
    accompanying: u32,
    now: DateTime<Utc>,
) -> Result<Seeded> {
    let guest = guest(event_id, name, now);
    let invitation = invitation_for(&guest, accompanying, now);

    let mut tx = repo.begin().await?;
    tx.insert_guest(&guest).await?;
    tx.insert_invitation(&invitation).await?;
    tx.commit().await?;

    Ok(Seeded { guest, invitation })
}
