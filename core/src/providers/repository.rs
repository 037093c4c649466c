//! Persistence provider traits.

use chrono::{DateTime, Utc};

use crate::audit::{AuditEntry, AuditQuery, NewAuditEntry};
use crate::error::Result;
use crate::tokens::{AcceptToken, CheckInToken, DeclineToken, TrackingToken};
use crate::types::{
    AccompanyingGuest, AccompanyingGuestId, Event, EventId, Guest, GuestId, Invitation,
    InvitationId, ResponseCounts,
};

/// Relational store for events, guests, invitations and the audit log.
///
/// Methods on the repository itself are plain reads outside any
/// transaction. Every mutation goes through a [`RepositoryTx`].
pub trait Repository: Send + Sync {
    /// Transaction type returned by [`Repository::begin`].
    type Tx: RepositoryTx;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if no connection is available.
    fn begin(&self) -> impl std::future::Future<Output = Result<Self::Tx>> + Send;

    /// Loads an event.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn find_event(
        &self,
        id: EventId,
    ) -> impl std::future::Future<Output = Result<Option<Event>>> + Send;

    /// Loads an invitation.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn find_invitation(
        &self,
        id: InvitationId,
    ) -> impl std::future::Future<Output = Result<Option<Invitation>>> + Send;

    /// Loads a guest.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn find_guest(
        &self,
        id: GuestId,
    ) -> impl std::future::Future<Output = Result<Option<Guest>>> + Send;

    /// Accompanying guests of an invitation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn list_accompanying(
        &self,
        invitation_id: InvitationId,
    ) -> impl std::future::Future<Output = Result<Vec<AccompanyingGuest>>> + Send;

    /// Counts invitations per response for an event.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn response_counts(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<ResponseCounts>> + Send;

    /// Audit entries matching `query`, newest first (`created_at` then id).
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn audit_entries(
        &self,
        query: &AuditQuery,
    ) -> impl std::future::Future<Output = Result<Vec<AuditEntry>>> + Send;

    /// Deletes audit entries created before `cutoff`, returning how many.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the delete fails.
    fn prune_audit_log(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Checks the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if it is not.
    fn ping(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// An open unit of work.
///
/// Dropping the transaction without calling [`RepositoryTx::commit`]
/// discards every write made through it.
pub trait RepositoryTx: Send + Sized {
    /// Locks an invitation by id.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_invitation(
        &mut self,
        id: InvitationId,
    ) -> impl std::future::Future<Output = Result<Option<Invitation>>> + Send;

    /// Locks the invitation owning an accept token.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_invitation_by_accept_token(
        &mut self,
        token: &AcceptToken,
    ) -> impl std::future::Future<Output = Result<Option<Invitation>>> + Send;

    /// Locks the invitation owning a decline token.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_invitation_by_decline_token(
        &mut self,
        token: &DeclineToken,
    ) -> impl std::future::Future<Output = Result<Option<Invitation>>> + Send;

    /// Locks the invitation owning a tracking token.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_invitation_by_tracking_token(
        &mut self,
        token: &TrackingToken,
    ) -> impl std::future::Future<Output = Result<Option<Invitation>>> + Send;

    /// Locks the invitation for a guest at an event.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_invitation_for_guest(
        &mut self,
        guest_id: GuestId,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Option<Invitation>>> + Send;

    /// Locks every invitation of an event, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_event_invitations(
        &mut self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Vec<Invitation>>> + Send;

    /// Locks a guest by id.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_guest(
        &mut self,
        id: GuestId,
    ) -> impl std::future::Future<Output = Result<Option<Guest>>> + Send;

    /// Locks the guest holding a check-in token.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_guest_by_check_in_token(
        &mut self,
        token: &CheckInToken,
    ) -> impl std::future::Future<Output = Result<Option<Guest>>> + Send;

    /// Reads, without locking, the accompanying guest holding a check-in
    /// token. Callers lock the owning invitation and then re-read with
    /// [`RepositoryTx::lock_accompanying`].
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn find_accompanying_by_check_in_token(
        &mut self,
        token: &CheckInToken,
    ) -> impl std::future::Future<Output = Result<Option<AccompanyingGuest>>> + Send;

    /// Locks an accompanying guest by id.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_accompanying(
        &mut self,
        id: AccompanyingGuestId,
    ) -> impl std::future::Future<Output = Result<Option<AccompanyingGuest>>> + Send;

    /// Locks the accompanying guests of an invitation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the query fails.
    fn lock_accompanying_for_invitation(
        &mut self,
        invitation_id: InvitationId,
    ) -> impl std::future::Future<Output = Result<Vec<AccompanyingGuest>>> + Send;

    /// Inserts a guest.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the insert fails.
    fn insert_guest(&mut self, guest: &Guest)
    -> impl std::future::Future<Output = Result<()>> + Send;

    /// Writes every column of an existing guest.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the update fails.
    fn update_guest(&mut self, guest: &Guest)
    -> impl std::future::Future<Output = Result<()>> + Send;

    /// Inserts an invitation.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the guest already has an invitation for the
    /// event, `Persistence` if the insert fails otherwise.
    fn insert_invitation(
        &mut self,
        invitation: &Invitation,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Writes every column of an existing invitation.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the update fails.
    fn update_invitation(
        &mut self,
        invitation: &Invitation,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Inserts an accompanying guest.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the insert fails.
    fn insert_accompanying(
        &mut self,
        guest: &AccompanyingGuest,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Writes every column of an existing accompanying guest.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the update fails.
    fn update_accompanying(
        &mut self,
        guest: &AccompanyingGuest,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Removes an accompanying guest, and with it its check-in token.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the delete fails.
    fn delete_accompanying(
        &mut self,
        id: AccompanyingGuestId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Appends an audit entry.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the insert fails.
    fn append_audit(
        &mut self,
        entry: &NewAuditEntry,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Commits every write made through this transaction.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the commit fails; nothing is written then.
    fn commit(self) -> impl std::future::Future<Output = Result<()>> + Send;
}
