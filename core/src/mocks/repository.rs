//! In-memory repository for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::audit::{AuditEntry, AuditQuery, NewAuditEntry};
use crate::error::{GuestlistError, Result};
use crate::providers::{Repository, RepositoryTx};
use crate::tokens::{AcceptToken, CheckInToken, DeclineToken, TrackingToken};
use crate::types::{
    AccompanyingGuest, AccompanyingGuestId, Event, EventId, Guest, GuestId, Invitation,
    InvitationId, ResponseCounts, RsvpResponse,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    guests: HashMap<GuestId, Guest>,
    invitations: HashMap<InvitationId, Invitation>,
    accompanying: Vec<AccompanyingGuest>,
    audit: Vec<AuditEntry>,
    next_audit_id: i64,
}

impl Tables {
    fn invitation_where(&self, pred: impl Fn(&Invitation) -> bool) -> Option<Invitation> {
        self.invitations.values().find(|inv| pred(inv)).cloned()
    }

    fn party_of(&self, invitation_id: InvitationId) -> Vec<AccompanyingGuest> {
        self.accompanying
            .iter()
            .filter(|a| a.invitation_id == invitation_id)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_commits: AtomicBool,
    fail_guest_updates: AtomicBool,
    commits: AtomicUsize,
}

/// In-memory repository.
///
/// A transaction takes the single table lock for its whole lifetime, works
/// on a private copy and publishes it on commit. Transactions are therefore
/// fully serialized, and dropping one discards its writes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl InMemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an event (events are managed outside this system).
    pub async fn insert_event(&self, event: Event) {
        self.tables.lock().await.events.insert(event.id, event);
    }

    /// Current state of a guest (for assertions).
    pub async fn guest(&self, id: GuestId) -> Option<Guest> {
        self.tables.lock().await.guests.get(&id).cloned()
    }

    /// Current state of an invitation (for assertions).
    pub async fn invitation(&self, id: InvitationId) -> Option<Invitation> {
        self.tables.lock().await.invitations.get(&id).cloned()
    }

    /// Accompanying guests of an invitation (for assertions).
    pub async fn party(&self, invitation_id: InvitationId) -> Vec<AccompanyingGuest> {
        self.tables.lock().await.party_of(invitation_id)
    }

    /// Every audit entry in insertion order (for assertions).
    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.tables.lock().await.audit.clone()
    }

    /// Number of successful commits so far.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.faults.commits.load(Ordering::SeqCst)
    }

    /// Make every following commit fail.
    pub fn fail_commits(&self, fail: bool) {
        self.faults.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Make every following guest update fail.
    pub fn fail_guest_updates(&self, fail: bool) {
        self.faults.fail_guest_updates.store(fail, Ordering::SeqCst);
    }
}

impl Repository for InMemoryRepository {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = (*guard).clone();
        Ok(InMemoryTx { guard, working, faults: Arc::clone(&self.faults) })
    }

    async fn find_event(&self, id: EventId) -> Result<Option<Event>> {
        Ok(self.tables.lock().await.events.get(&id).cloned())
    }

    async fn find_invitation(&self, id: InvitationId) -> Result<Option<Invitation>> {
        Ok(self.invitation(id).await)
    }

    async fn find_guest(&self, id: GuestId) -> Result<Option<Guest>> {
        Ok(self.guest(id).await)
    }

    async fn list_accompanying(&self, invitation_id: InvitationId) -> Result<Vec<AccompanyingGuest>> {
        Ok(self.party(invitation_id).await)
    }

    async fn response_counts(&self, event_id: EventId) -> Result<ResponseCounts> {
        let tables = self.tables.lock().await;
        let mut counts = ResponseCounts::default();
        for invitation in tables.invitations.values().filter(|i| i.event_id == event_id) {
            match invitation.response {
                RsvpResponse::Accepted => counts.accepted += 1,
                RsvpResponse::Declined => counts.declined += 1,
                RsvpResponse::Pending => counts.pending += 1,
            }
        }
        Ok(counts)
    }

    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let tables = self.tables.lock().await;
        let mut entries: Vec<AuditEntry> =
            tables.audit.iter().filter(|e| query.matches(e)).cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn prune_audit_log(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tables = self.tables.lock().await;
        let before = tables.audit.len();
        tables.audit.retain(|e| e.created_at >= cutoff);
        Ok((before - tables.audit.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Transaction over [`InMemoryRepository`].
#[derive(Debug)]
pub struct InMemoryTx {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    faults: Arc<Faults>,
}

impl RepositoryTx for InMemoryTx {
    async fn lock_invitation(&mut self, id: InvitationId) -> Result<Option<Invitation>> {
        Ok(self.working.invitations.get(&id).cloned())
    }

    async fn lock_invitation_by_accept_token(
        &mut self,
        token: &AcceptToken,
    ) -> Result<Option<Invitation>> {
        Ok(self.working.invitation_where(|i| &i.accept_token == token))
    }

    async fn lock_invitation_by_decline_token(
        &mut self,
        token: &DeclineToken,
    ) -> Result<Option<Invitation>> {
        Ok(self.working.invitation_where(|i| &i.decline_token == token))
    }

    async fn lock_invitation_by_tracking_token(
        &mut self,
        token: &TrackingToken,
    ) -> Result<Option<Invitation>> {
        Ok(self.working.invitation_where(|i| &i.tracking_token == token))
    }

    async fn lock_invitation_for_guest(
        &mut self,
        guest_id: GuestId,
        event_id: EventId,
    ) -> Result<Option<Invitation>> {
        Ok(self.working.invitation_where(|i| i.guest_id == guest_id && i.event_id == event_id))
    }

    async fn lock_event_invitations(&mut self, event_id: EventId) -> Result<Vec<Invitation>> {
        let mut invitations: Vec<Invitation> = self
            .working
            .invitations
            .values()
            .filter(|i| i.event_id == event_id)
            .cloned()
            .collect();
        invitations.sort_by_key(|i| i.id);
        Ok(invitations)
    }

    async fn lock_guest(&mut self, id: GuestId) -> Result<Option<Guest>> {
        Ok(self.working.guests.get(&id).cloned())
    }

    async fn lock_guest_by_check_in_token(&mut self, token: &CheckInToken) -> Result<Option<Guest>> {
        Ok(self
            .working
            .guests
            .values()
            .find(|g| g.check_in_token.as_ref() == Some(token))
            .cloned())
    }

    async fn find_accompanying_by_check_in_token(
        &mut self,
        token: &CheckInToken,
    ) -> Result<Option<AccompanyingGuest>> {
        Ok(self.working.accompanying.iter().find(|a| &a.check_in_token == token).cloned())
    }

    async fn lock_accompanying(&mut self, id: AccompanyingGuestId) -> Result<Option<AccompanyingGuest>> {
        Ok(self.working.accompanying.iter().find(|a| a.id == id).cloned())
    }

    async fn lock_accompanying_for_invitation(
        &mut self,
        invitation_id: InvitationId,
    ) -> Result<Vec<AccompanyingGuest>> {
        Ok(self.working.party_of(invitation_id))
    }

    async fn insert_guest(&mut self, guest: &Guest) -> Result<()> {
        self.working.guests.insert(guest.id, guest.clone());
        Ok(())
    }

    async fn update_guest(&mut self, guest: &Guest) -> Result<()> {
        if self.faults.fail_guest_updates.load(Ordering::SeqCst) {
            return Err(GuestlistError::Persistence("injected guest update failure".into()));
        }
        match self.working.guests.get_mut(&guest.id) {
            Some(row) => {
                *row = guest.clone();
                Ok(())
            }
            None => Err(GuestlistError::Persistence(format!("guest {} vanished", guest.id))),
        }
    }

    async fn insert_invitation(&mut self, invitation: &Invitation) -> Result<()> {
        let duplicate = self
            .working
            .invitations
            .values()
            .any(|i| i.guest_id == invitation.guest_id && i.event_id == invitation.event_id);
        if duplicate {
            return Err(GuestlistError::Conflict(
                "guest already has an invitation for this event".into(),
            ));
        }
        self.working.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn update_invitation(&mut self, invitation: &Invitation) -> Result<()> {
        match self.working.invitations.get_mut(&invitation.id) {
            Some(row) => {
                *row = invitation.clone();
                Ok(())
            }
            None => Err(GuestlistError::Persistence(format!(
                "invitation {} vanished",
                invitation.id
            ))),
        }
    }

    async fn insert_accompanying(&mut self, guest: &AccompanyingGuest) -> Result<()> {
        self.working.accompanying.push(guest.clone());
        Ok(())
    }

    async fn update_accompanying(&mut self, guest: &AccompanyingGuest) -> Result<()> {
        match self.working.accompanying.iter_mut().find(|a| a.id == guest.id) {
            Some(row) => {
                *row = guest.clone();
                Ok(())
            }
            None => Err(GuestlistError::Persistence(format!(
                "accompanying guest {} vanished",
                guest.id
            ))),
        }
    }

    async fn delete_accompanying(&mut self, id: AccompanyingGuestId) -> Result<()> {
        let before = self.working.accompanying.len();
        self.working.accompanying.retain(|a| a.id != id);
        if self.working.accompanying.len() == before {
            return Err(GuestlistError::Persistence(format!("accompanying guest {id} vanished")));
        }
        Ok(())
    }

    async fn append_audit(&mut self, entry: &NewAuditEntry) -> Result<()> {
        self.working.next_audit_id += 1;
        let id = self.working.next_audit_id;
        self.working.audit.push(AuditEntry {
            id,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            action: entry.action,
            old_values: entry.old_values.clone(),
            new_values: entry.new_values.clone(),
            event_id: entry.event_id,
            user_id: entry.user_id,
            created_at: entry.created_at,
        });
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        if self.faults.fail_commits.load(Ordering::SeqCst) {
            return Err(GuestlistError::Persistence("injected commit failure".into()));
        }
        let Self { mut guard, working, faults } = self;
        *guard = working;
        faults.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
