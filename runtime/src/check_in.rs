//! Door check-in and the attendance toggle.
//!
//! A scanned token is looked up first among guests, then among
//! accompanying guests. Both paths write the same attendance keys as the
//! manual toggle, so the guest list shows one consistent truth.

use chrono::{DateTime, Utc};
use guestlist_core::attributes::keys;
use guestlist_core::audit::{AuditAction, AuditContext};
use guestlist_core::providers::{Notifier, Repository, RepositoryTx};
use guestlist_core::tokens::CheckInToken;
use guestlist_core::types::{AccompanyingGuest, Actor, EventId, Guest, GuestId, RsvpResponse};
use guestlist_core::{GuestlistError, Result};
use serde::Serialize;

use crate::environment::GuestlistEnvironment;
use crate::messages;
use crate::metrics::CheckInMetrics;
use crate::persist;

/// Who a check-in token belonged to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckInKind {
    /// The invited guest.
    Guest,
    /// Someone in the guest's party.
    AccompanyingGuest,
}

impl CheckInKind {
    const fn metric_label(self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::AccompanyingGuest => "accompanying",
        }
    }
}

/// Result of an admitted check-in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReceipt {
    /// Who was admitted.
    pub kind: CheckInKind,
    /// Display name.
    pub name: String,
    /// Event admitted to.
    pub event_id: EventId,
    /// Event title, if the event could be loaded.
    pub event_title: Option<String>,
    /// `true` if this person had checked in before.
    pub already_checked_in: bool,
    /// Recorded arrival time.
    pub arrived_at: DateTime<Utc>,
}

struct Arrival {
    kind: CheckInKind,
    name: String,
    host: Option<String>,
    event_id: EventId,
    first: bool,
    arrived_at: DateTime<Utc>,
}

/// Check-in desk operations.
#[derive(Clone)]
pub struct CheckInService<R, N> {
    env: GuestlistEnvironment<R, N>,
}

impl<R, N> CheckInService<R, N>
where
    R: Repository,
    N: Notifier + Clone + 'static,
{
    /// Creates the service.
    #[must_use]
    pub const fn new(env: GuestlistEnvironment<R, N>) -> Self {
        Self { env }
    }

    /// Admits the holder of `token`.
    ///
    /// A guest who is already present is admitted again without any write
    /// or notification. An accompanying guest's arrival time is overwritten
    /// on every scan; organizers are only notified of the first one.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the token is unknown, revoked, or belongs to a party
    ///   whose invitation is no longer accepted (nothing is written)
    /// - `Persistence` if the transaction fails
    #[tracing::instrument(skip_all)]
    pub async fn check_in(&self, token: &CheckInToken) -> Result<CheckInReceipt> {
        let now = self.env.clock.now();
        let mut tx = self.env.repository.begin().await?;

        let arrival = if let Some(guest) = tx.lock_guest_by_check_in_token(token).await? {
            admit_guest(tx, guest, now).await?
        } else if let Some(companion) = tx.find_accompanying_by_check_in_token(token).await? {
            admit_companion(tx, companion, token, now).await?
        } else {
            None
        };

        let Some(arrival) = arrival else {
            CheckInMetrics::record_denied();
            tracing::warn!("Check-in denied: unknown or revoked token");
            return Err(GuestlistError::not_found("check-in token"));
        };

        CheckInMetrics::record_admitted(arrival.kind.metric_label(), arrival.first);
        tracing::info!(
            kind = ?arrival.kind,
            event_id = %arrival.event_id,
            first = arrival.first,
            "Check-in admitted"
        );

        let event = self
            .env
            .repository
            .find_event(arrival.event_id)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Event lookup for check-in failed"))
            .ok()
            .flatten();

        if arrival.first {
            let notification = messages::guest_arrived(
                &self.env.public_base_url,
                arrival.event_id,
                event.as_ref(),
                &arrival.name,
                arrival.host.as_deref(),
            );
            self.env.dispatcher.dispatch(notification).await;
        }

        Ok(CheckInReceipt {
            kind: arrival.kind,
            name: arrival.name,
            event_id: arrival.event_id,
            event_title: event.map(|e| e.title),
            already_checked_in: !arrival.first,
            arrived_at: arrival.arrived_at,
        })
    }

    /// Marks a guest present or absent from the guest list.
    ///
    /// Marking present stamps `Anwesend Datum` unless the guest already is
    /// present; marking absent removes it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the guest does not exist
    /// - `Persistence` if the transaction fails
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn set_attendance(&self, guest_id: GuestId, present: bool, actor: &Actor) -> Result<Guest> {
        let now = self.env.clock.now();
        let mut tx = self.env.repository.begin().await?;
        let before = tx.lock_guest(guest_id).await?.ok_or(GuestlistError::not_found("guest"))?;

        let mut guest = before.clone();
        let changed = if present {
            guest.additional_data.mark_present(now)
        } else {
            guest.additional_data.mark_absent()
        };
        if !changed {
            return Ok(guest);
        }

        let ctx = AuditContext::by(Some(actor), guest.event_id, now);
        persist::write_guest(&mut tx, &before, &mut guest, AuditAction::Update, &ctx).await?;
        tx.commit().await?;

        tracing::info!(guest_id = %guest.id, present, "Attendance updated");
        Ok(guest)
    }
}

async fn admit_guest<T: RepositoryTx>(
    mut tx: T,
    before: Guest,
    now: DateTime<Utc>,
) -> Result<Option<Arrival>> {
    let mut guest = before.clone();
    let first = guest.additional_data.mark_present(now);
    if first {
        let ctx = AuditContext::anonymous(guest.event_id, now);
        persist::write_guest(&mut tx, &before, &mut guest, AuditAction::Update, &ctx).await?;
        tx.commit().await?;
    }

    Ok(Some(Arrival {
        kind: CheckInKind::Guest,
        arrived_at: guest.additional_data.timestamp(keys::PRESENT_AT).unwrap_or(now),
        name: guest.name,
        host: None,
        event_id: guest.event_id,
        first,
    }))
}

async fn admit_companion<T: RepositoryTx>(
    mut tx: T,
    found: AccompanyingGuest,
    token: &CheckInToken,
    now: DateTime<Utc>,
) -> Result<Option<Arrival>> {
    let Some(invitation) = tx.lock_invitation(found.invitation_id).await? else {
        return Ok(None);
    };
    if invitation.response != RsvpResponse::Accepted {
        return Ok(None);
    }
    let host = tx.lock_guest(invitation.guest_id).await?.map(|g| g.name);
    let Some(before) = tx.lock_accompanying(found.id).await? else {
        return Ok(None);
    };
    if &before.check_in_token != token {
        return Ok(None);
    }

    let mut companion = before.clone();
    let first = companion.arrived_at.is_none();
    companion.arrived_at = Some(now);

    let ctx = AuditContext::anonymous(invitation.event_id, now);
    persist::write_companion(&mut tx, &before, &companion, AuditAction::Update, &ctx).await?;
    tx.commit().await?;

    Ok(Some(Arrival {
        kind: CheckInKind::AccompanyingGuest,
        name: companion.display_name(),
        host,
        event_id: invitation.event_id,
        first,
        arrived_at: now,
    }))
}
