//! Operator-triggered bulk undo for one event.
//!
//! Two independent operations:
//!
//! - **Responses**: every answered invitation goes back to `PENDING` in a
//!   single transaction, and the guests lose their admission right.
//! - **Column changes**: the latest guest `UPDATE` entry per guest inside a
//!   time window is read from the audit log, and the whitelisted attribute
//!   keys of its "before" snapshot are written back. Each guest is its own
//!   transaction; a guest that cannot be restored is skipped.
//!
//! Writes made here are audited as `REVERT`, so a second column revert never
//! picks up the first one's restore as "the last edit".

use chrono::Duration;
use guestlist_core::attributes::{AttributeBag, REVERTIBLE_KEYS};
use guestlist_core::audit::{AuditAction, AuditContext, AuditQuery, latest_per_entity};
use guestlist_core::providers::{Repository, RepositoryTx};
use guestlist_core::tokens::TokenIssuer;
use guestlist_core::types::{Actor, EventId, GuestId, GuestStatus, RsvpResponse};
use guestlist_core::{GuestlistError, Result};
use serde::Serialize;

use crate::environment::GuestlistEnvironment;
use crate::metrics::RevertMetrics;
use crate::persist;

/// Outcome of a revert.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RevertSummary {
    /// Number of records actually changed.
    pub reverted: u64,
}

/// Bulk revert operations.
#[derive(Clone)]
pub struct RevertEngine<R, N> {
    env: GuestlistEnvironment<R, N>,
}

impl<R, N> RevertEngine<R, N>
where
    R: Repository,
{
    /// Creates the engine.
    #[must_use]
    pub const fn new(env: GuestlistEnvironment<R, N>) -> Self {
        Self { env }
    }

    /// Resets every answered invitation of the event to `PENDING`.
    ///
    /// `respondedAt` is cleared and each affected guest goes back to
    /// `INVITED` without a check-in token. Accompanying guests get fresh
    /// check-in tokens, so passes handed out before the revert stop working
    /// even after the invitation is accepted again. Attribute bags are left
    /// alone.
    /// All of it commits together or not at all.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the event does not exist
    /// - `Persistence` if the transaction fails (nothing is reverted)
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn revert_responses(&self, event_id: EventId, actor: &Actor) -> Result<RevertSummary> {
        self.require_event(event_id).await?;
        let now = self.env.clock.now();
        let ctx = AuditContext::by(Some(actor), event_id, now);

        let mut tx = self.env.repository.begin().await?;
        let invitations = tx.lock_event_invitations(event_id).await?;

        let mut reverted = 0;
        for before in invitations.into_iter().filter(|i| i.response.is_terminal()) {
            let mut invitation = before.clone();
            invitation.response = RsvpResponse::Pending;
            invitation.responded_at = None;
            persist::write_invitation(&mut tx, &before, &mut invitation, AuditAction::Revert, &ctx)
                .await?;
            reverted += 1;

            let party = tx.lock_accompanying_for_invitation(invitation.id).await?;
            for companion_before in party {
                let mut companion = companion_before.clone();
                companion.check_in_token = TokenIssuer.issue();
                persist::write_companion(
                    &mut tx,
                    &companion_before,
                    &companion,
                    AuditAction::Revert,
                    &ctx,
                )
                .await?;
            }

            let Some(guest_before) = tx.lock_guest(invitation.guest_id).await? else {
                tracing::warn!(invitation_id = %invitation.id, "Invitation without guest");
                continue;
            };
            let mut guest = guest_before.clone();
            guest.check_in_token = None;
            guest.status = GuestStatus::Invited;
            if guest != guest_before {
                persist::write_guest(&mut tx, &guest_before, &mut guest, AuditAction::Revert, &ctx)
                    .await?;
            }
        }

        tx.commit().await?;

        RevertMetrics::record("responses", reverted);
        tracing::info!(event_id = %event_id, reverted, "Responses reverted");
        Ok(RevertSummary { reverted })
    }

    /// Restores the whitelisted attribute keys from each guest's latest edit
    /// within the last `since_hours` hours.
    ///
    /// Only keys present in the recorded snapshot are written; every other
    /// key keeps its current value. Entries without a usable snapshot, and
    /// guests that are gone or fail to save, are skipped and do not count.
    ///
    /// # Errors
    ///
    /// - `Validation` if `since_hours` is zero or above the configured limit
    /// - `NotFound` if the event does not exist
    /// - `Persistence` if the audit log cannot be read
    #[tracing::instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn revert_column_changes(
        &self,
        event_id: EventId,
        since_hours: Option<u32>,
        actor: &Actor,
    ) -> Result<RevertSummary> {
        let settings = &self.env.settings;
        let hours = since_hours.unwrap_or(settings.default_revert_window_hours);
        if hours == 0 || hours > settings.max_revert_window_hours {
            return Err(GuestlistError::Validation(format!(
                "sinceHours must be between 1 and {}",
                settings.max_revert_window_hours
            )));
        }
        self.require_event(event_id).await?;

        let now = self.env.clock.now();
        let since = now - Duration::hours(i64::from(hours));
        let entries = self
            .env
            .repository
            .audit_entries(&AuditQuery::guest_updates(event_id, since))
            .await?;
        let ctx = AuditContext::by(Some(actor), event_id, now);

        let mut reverted = 0;
        for entry in latest_per_entity(&entries) {
            let Some(snapshot) = entry.previous_attributes() else {
                tracing::debug!(audit_id = entry.id, "No usable snapshot, skipping");
                continue;
            };
            if !snapshot.contains_any(&REVERTIBLE_KEYS) {
                continue;
            }

            let guest_id = GuestId::from_uuid(entry.entity_id);
            match self.restore_guest(guest_id, &snapshot, &ctx).await {
                Ok(true) => reverted += 1,
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(guest_id = %guest_id, error = %error, "Column revert skipped guest");
                }
            }
        }

        RevertMetrics::record("columns", reverted);
        tracing::info!(event_id = %event_id, hours, reverted, "Column changes reverted");
        Ok(RevertSummary { reverted })
    }

    async fn restore_guest(
        &self,
        guest_id: GuestId,
        snapshot: &AttributeBag,
        ctx: &AuditContext,
    ) -> Result<bool> {
        let mut tx = self.env.repository.begin().await?;
        let Some(before) = tx.lock_guest(guest_id).await? else {
            return Ok(false);
        };
        if before.event_id != ctx.event_id {
            return Ok(false);
        }

        let mut guest = before.clone();
        if !guest.additional_data.restore_from(snapshot, &REVERTIBLE_KEYS) {
            return Ok(false);
        }
        persist::write_guest(&mut tx, &before, &mut guest, AuditAction::Revert, ctx).await?;
        tx.commit().await?;
        Ok(true)
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
