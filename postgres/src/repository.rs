//! [`Repository`] over a `PostgreSQL` pool.

use chrono::{DateTime, Utc};
use guestlist_core::audit::{AuditEntry, AuditQuery, NewAuditEntry};
use guestlist_core::providers::{Repository, RepositoryTx};
use guestlist_core::tokens::{AcceptToken, CheckInToken, DeclineToken, OpaqueToken, TrackingToken};
use guestlist_core::types::{
    AccompanyingGuest, AccompanyingGuestId, Event, EventId, Guest, GuestId, Invitation,
    InvitationId, ResponseCounts, RsvpResponse,
};
use guestlist_core::{GuestlistError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use crate::rows::{
    AccompanyingRow, AuditRow, EventRow, GuestRow, InvitationRow, accompanying_columns,
    audit_columns, convert_all, guest_columns, invitation_columns, party_size,
};

const INVITATION_GUEST_EVENT_KEY: &str = "invitations_guest_event_key";

/// Maps a driver error into a persistence error tagged with the failed
/// operation.
pub(crate) fn persistence(operation: &'static str) -> impl Fn(sqlx::Error) -> GuestlistError {
    move |e| {
        metrics::counter!("guestlist_db_errors_total", "operation" => operation).increment(1);
        tracing::warn!(operation, error = %e, "database operation failed");
        GuestlistError::Persistence(format!("{operation} failed: {e}"))
    }
}

/// `PostgreSQL` repository.
///
/// Reads outside a transaction go straight to the pool. Every mutation runs
/// in a [`PostgresTx`], whose `lock_*` reads take `FOR UPDATE` row locks.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool against `database_url`.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if no connection can be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(persistence("connect"))?;
        Ok(Self::new(pool))
    }

    /// Applies the bundled migrations.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GuestlistError::Persistence(format!("Migration failed: {e}")))?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts an event row. Events are owned by the surrounding
    /// application; this exists for seeding and tests.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the insert fails.
    pub async fn insert_event(&self, event: &Event) -> Result<()> {
        sqlx::query("INSERT INTO events (id, title, starts_at) VALUES ($1, $2, $3)")
            .bind(event.id.as_uuid())
            .bind(&event.title)
            .bind(event.starts_at)
            .execute(&self.pool)
            .await
            .map_err(persistence("insert event"))?;
        Ok(())
    }
}

impl Repository for PostgresRepository {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<PostgresTx> {
        let tx = self.pool.begin().await.map_err(persistence("begin transaction"))?;
        Ok(PostgresTx { tx })
    }

    async fn find_event(&self, id: EventId) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, title, starts_at FROM events WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence("load event"))?;
        Ok(row.map(Event::from))
    }

    async fn find_invitation(&self, id: InvitationId) -> Result<Option<Invitation>> {
        sqlx::query_as::<_, InvitationRow>(concat!(
            "SELECT ",
            invitation_columns!(),
            " FROM invitations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence("load invitation"))?
        .map(Invitation::try_from)
        .transpose()
    }

    async fn find_guest(&self, id: GuestId) -> Result<Option<Guest>> {
        sqlx::query_as::<_, GuestRow>(concat!("SELECT ", guest_columns!(), " FROM guests WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence("load guest"))?
            .map(Guest::try_from)
            .transpose()
    }

    async fn list_accompanying(&self, invitation_id: InvitationId) -> Result<Vec<AccompanyingGuest>> {
        let rows = sqlx::query_as::<_, AccompanyingRow>(concat!(
            "SELECT ",
            accompanying_columns!(),
            " FROM accompanying_guests WHERE invitation_id = $1 ORDER BY seq"
        ))
        .bind(invitation_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence("list accompanying guests"))?;
        Ok(rows.into_iter().map(AccompanyingGuest::from).collect())
    }

    async fn response_counts(&self, event_id: EventId) -> Result<ResponseCounts> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT response, COUNT(*) FROM invitations WHERE event_id = $1 GROUP BY response",
        )
        .bind(event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence("count responses"))?;

        let mut counts = ResponseCounts::default();
        for (response, n) in rows {
            let n = u64::try_from(n).unwrap_or_default();
            match response.parse::<RsvpResponse>()? {
                RsvpResponse::Accepted => counts.accepted = n,
                RsvpResponse::Declined => counts.declined = n,
                RsvpResponse::Pending => counts.pending = n,
            }
        }
        Ok(counts)
    }

    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(concat!(
            "SELECT ",
            audit_columns!(),
            " FROM audit_logs \
             WHERE ($1::uuid IS NULL OR event_id = $1) \
               AND ($2::text IS NULL OR entity_type = $2) \
               AND ($3::text IS NULL OR action = $3) \
               AND ($4::timestamptz IS NULL OR created_at >= $4) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(query.event_id.map(|id| *id.as_uuid()))
        .bind(query.entity_type.map(|t| t.as_str()))
        .bind(query.action.map(|a| a.as_str()))
        .bind(query.since)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence("query audit log"))?;
        convert_all(rows)
    }

    async fn prune_audit_log(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM audit_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(persistence("prune audit log"))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(persistence("ping"))?;
        Ok(())
    }
}

/// An open `PostgreSQL` transaction.
///
/// Dropping it without [`RepositoryTx::commit`] rolls back.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

impl PostgresTx {
    async fn invitation_where(
        &mut self,
        sql: &'static str,
        key: &str,
        operation: &'static str,
    ) -> Result<Option<Invitation>> {
        sqlx::query_as::<_, InvitationRow>(sql)
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(persistence(operation))?
            .map(Invitation::try_from)
            .transpose()
    }
}

impl RepositoryTx for PostgresTx {
    async fn lock_invitation(&mut self, id: InvitationId) -> Result<Option<Invitation>> {
        sqlx::query_as::<_, InvitationRow>(concat!(
            "SELECT ",
            invitation_columns!(),
            " FROM invitations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(persistence("lock invitation"))?
        .map(Invitation::try_from)
        .transpose()
    }

    async fn lock_invitation_by_accept_token(
        &mut self,
        token: &AcceptToken,
    ) -> Result<Option<Invitation>> {
        self.invitation_where(
            concat!("SELECT ", invitation_columns!(), " FROM invitations WHERE accept_token = $1 FOR UPDATE"),
            token.as_str(),
            "lock invitation by accept token",
        )
        .await
    }

    async fn lock_invitation_by_decline_token(
        &mut self,
        token: &DeclineToken,
    ) -> Result<Option<Invitation>> {
        self.invitation_where(
            concat!("SELECT ", invitation_columns!(), " FROM invitations WHERE decline_token = $1 FOR UPDATE"),
            token.as_str(),
            "lock invitation by decline token",
        )
        .await
    }

    async fn lock_invitation_by_tracking_token(
        &mut self,
        token: &TrackingToken,
    ) -> Result<Option<Invitation>> {
        self.invitation_where(
            concat!("SELECT ", invitation_columns!(), " FROM invitations WHERE tracking_token = $1 FOR UPDATE"),
            token.as_str(),
            "lock invitation by tracking token",
        )
        .await
    }

    async fn lock_invitation_for_guest(
        &mut self,
        guest_id: GuestId,
        event_id: EventId,
    ) -> Result<Option<Invitation>> {
        sqlx::query_as::<_, InvitationRow>(concat!(
            "SELECT ",
            invitation_columns!(),
            " FROM invitations WHERE guest_id = $1 AND event_id = $2 FOR UPDATE"
        ))
        .bind(guest_id.as_uuid())
        .bind(event_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(persistence("lock invitation for guest"))?
        .map(Invitation::try_from)
        .transpose()
    }

    async fn lock_event_invitations(&mut self, event_id: EventId) -> Result<Vec<Invitation>> {
        let rows = sqlx::query_as::<_, InvitationRow>(concat!(
            "SELECT ",
            invitation_columns!(),
            " FROM invitations WHERE event_id = $1 ORDER BY id FOR UPDATE"
        ))
        .bind(event_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(persistence("lock event invitations"))?;
        convert_all(rows)
    }

    async fn lock_guest(&mut self, id: GuestId) -> Result<Option<Guest>> {
        sqlx::query_as::<_, GuestRow>(concat!(
            "SELECT ",
            guest_columns!(),
            " FROM guests WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(persistence("lock guest"))?
        .map(Guest::try_from)
        .transpose()
    }

    async fn lock_guest_by_check_in_token(&mut self, token: &CheckInToken) -> Result<Option<Guest>> {
        sqlx::query_as::<_, GuestRow>(concat!(
            "SELECT ",
            guest_columns!(),
            " FROM guests WHERE check_in_token = $1 FOR UPDATE"
        ))
        .bind(token.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(persistence("lock guest by check-in token"))?
        .map(Guest::try_from)
        .transpose()
    }

    async fn find_accompanying_by_check_in_token(
        &mut self,
        token: &CheckInToken,
    ) -> Result<Option<AccompanyingGuest>> {
        let row = sqlx::query_as::<_, AccompanyingRow>(concat!(
            "SELECT ",
            accompanying_columns!(),
            " FROM accompanying_guests WHERE check_in_token = $1"
        ))
        .bind(token.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(persistence("find accompanying guest by check-in token"))?;
        Ok(row.map(AccompanyingGuest::from))
    }

    async fn lock_accompanying(&mut self, id: AccompanyingGuestId) -> Result<Option<AccompanyingGuest>> {
        let row = sqlx::query_as::<_, AccompanyingRow>(concat!(
            "SELECT ",
            accompanying_columns!(),
            " FROM accompanying_guests WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(persistence("lock accompanying guest"))?;
        Ok(row.map(AccompanyingGuest::from))
    }

    async fn lock_accompanying_for_invitation(
        &mut self,
        invitation_id: InvitationId,
    ) -> Result<Vec<AccompanyingGuest>> {
        let rows = sqlx::query_as::<_, AccompanyingRow>(concat!(
            "SELECT ",
            accompanying_columns!(),
            " FROM accompanying_guests WHERE invitation_id = $1 ORDER BY seq FOR UPDATE"
        ))
        .bind(invitation_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(persistence("lock accompanying guests"))?;
        Ok(rows.into_iter().map(AccompanyingGuest::from).collect())
    }

    async fn insert_guest(&mut self, guest: &Guest) -> Result<()> {
        sqlx::query(concat!(
            "INSERT INTO guests (",
            guest_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        ))
        .bind(guest.id.as_uuid())
        .bind(guest.event_id.as_uuid())
        .bind(&guest.name)
        .bind(&guest.email)
        .bind(&guest.phone)
        .bind(&guest.organization)
        .bind(guest.status.as_str())
        .bind(guest.check_in_token.as_ref().map(|t| t.as_str()))
        .bind(guest.additional_data.to_json_string())
        .bind(&guest.table_number)
        .bind(guest.created_at)
        .bind(guest.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(persistence("insert guest"))?;
        Ok(())
    }

    async fn update_guest(&mut self, guest: &Guest) -> Result<()> {
        let result = sqlx::query(
            "UPDATE guests SET name = $2, email = $3, phone = $4, organization = $5, \
             status = $6, check_in_token = $7, additional_data = $8, table_number = $9, \
             updated_at = $10 WHERE id = $1",
        )
        .bind(guest.id.as_uuid())
        .bind(&guest.name)
        .bind(&guest.email)
        .bind(&guest.phone)
        .bind(&guest.organization)
        .bind(guest.status.as_str())
        .bind(guest.check_in_token.as_ref().map(|t| t.as_str()))
        .bind(guest.additional_data.to_json_string())
        .bind(&guest.table_number)
        .bind(guest.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(persistence("update guest"))?;
        if result.rows_affected() == 0 {
            return Err(GuestlistError::Persistence(format!("guest {} vanished", guest.id)));
        }
        Ok(())
    }

    async fn insert_invitation(&mut self, invitation: &Invitation) -> Result<()> {
        let result = sqlx::query(concat!(
            "INSERT INTO invitations (",
            invitation_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(invitation.id.as_uuid())
        .bind(invitation.guest_id.as_uuid())
        .bind(invitation.event_id.as_uuid())
        .bind(invitation.response.as_str())
        .bind(invitation.responded_at)
        .bind(invitation.accept_token.as_str())
        .bind(invitation.decline_token.as_str())
        .bind(invitation.tracking_token.as_str())
        .bind(party_size(invitation)?)
        .bind(invitation.sent_at)
        .bind(invitation.opened_at)
        .bind(invitation.email_sent_at)
        .bind(invitation.whatsapp_sent_at)
        .bind(invitation.created_at)
        .bind(invitation.updated_at)
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation()
                    && db_err.constraint() == Some(INVITATION_GUEST_EVENT_KEY) =>
            {
                Err(GuestlistError::Conflict(
                    "guest already has an invitation for this event".into(),
                ))
            }
            Err(e) => Err(persistence("insert invitation")(e)),
        }
    }

    async fn update_invitation(&mut self, invitation: &Invitation) -> Result<()> {
        let result = sqlx::query(
            "UPDATE invitations SET response = $2, responded_at = $3, accept_token = $4, \
             decline_token = $5, tracking_token = $6, accompanying_guests_count = $7, \
             sent_at = $8, opened_at = $9, email_sent_at = $10, whatsapp_sent_at = $11, \
             updated_at = $12 WHERE id = $1",
        )
        .bind(invitation.id.as_uuid())
        .bind(invitation.response.as_str())
        .bind(invitation.responded_at)
        .bind(invitation.accept_token.as_str())
        .bind(invitation.decline_token.as_str())
        .bind(invitation.tracking_token.as_str())
        .bind(party_size(invitation)?)
        .bind(invitation.sent_at)
        .bind(invitation.opened_at)
        .bind(invitation.email_sent_at)
        .bind(invitation.whatsapp_sent_at)
        .bind(invitation.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(persistence("update invitation"))?;
        if result.rows_affected() == 0 {
            return Err(GuestlistError::Persistence(format!(
                "invitation {} vanished",
                invitation.id
            )));
        }
        Ok(())
    }

    async fn insert_accompanying(&mut self, guest: &AccompanyingGuest) -> Result<()> {
        sqlx::query(concat!(
            "INSERT INTO accompanying_guests (",
            accompanying_columns!(),
            ") VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        ))
        .bind(guest.id.as_uuid())
        .bind(guest.invitation_id.as_uuid())
        .bind(&guest.first_name)
        .bind(&guest.last_name)
        .bind(&guest.funktion)
        .bind(&guest.email)
        .bind(guest.check_in_token.as_str())
        .bind(guest.arrived_at)
        .bind(guest.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(persistence("insert accompanying guest"))?;
        Ok(())
    }

    async fn update_accompanying(&mut self, guest: &AccompanyingGuest) -> Result<()> {
        let result = sqlx::query(
            "UPDATE accompanying_guests SET first_name = $2, last_name = $3, funktion = $4, \
             email = $5, check_in_token = $6, arrived_at = $7 WHERE id = $1",
        )
        .bind(guest.id.as_uuid())
        .bind(&guest.first_name)
        .bind(&guest.last_name)
        .bind(&guest.funktion)
        .bind(&guest.email)
        .bind(guest.check_in_token.as_str())
        .bind(guest.arrived_at)
        .execute(&mut *self.tx)
        .await
        .map_err(persistence("update accompanying guest"))?;
        if result.rows_affected() == 0 {
            return Err(GuestlistError::Persistence(format!(
                "accompanying guest {} vanished",
                guest.id
            )));
        }
        Ok(())
    }

    async fn delete_accompanying(&mut self, id: AccompanyingGuestId) -> Result<()> {
        let result = sqlx::query("DELETE FROM accompanying_guests WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(persistence("delete accompanying guest"))?;
        if result.rows_affected() == 0 {
            return Err(GuestlistError::Persistence(format!("accompanying guest {id} vanished")));
        }
        Ok(())
    }

    async fn append_audit(&mut self, entry: &NewAuditEntry) -> Result<()> {
        sqlx::query(
            "INSERT INTO audit_logs \
             (entity_type, entity_id, action, old_values, new_values, event_id, user_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(entry.action.as_str())
        .bind(&entry.old_values)
        .bind(&entry.new_values)
        .bind(entry.event_id.as_uuid())
        .bind(entry.user_id.map(|id| *id.as_uuid()))
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(persistence("append audit entry"))?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(persistence("commit"))?;
        metrics::counter!("guestlist_db_commits_total").increment(1);
        Ok(())
    }
}
