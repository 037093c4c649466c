//! Row structs and their conversion into domain types.

use chrono::{DateTime, Utc};
use guestlist_core::attributes::AttributeBag;
use guestlist_core::audit::AuditEntry;
use guestlist_core::tokens::OpaqueToken;
use guestlist_core::types::{
    AccompanyingGuest, AccompanyingGuestId, Event, EventId, Guest, GuestId, Invitation,
    InvitationId, UserId,
};
use guestlist_core::{GuestlistError, Result};
use uuid::Uuid;

/// Column lists, kept next to the row structs they must match.
macro_rules! guest_columns {
    () => {
        "id, event_id, name, email, phone, organization, status, check_in_token, \
         additional_data, table_number, created_at, updated_at"
    };
}

macro_rules! invitation_columns {
    () => {
        "id, guest_id, event_id, response, responded_at, accept_token, decline_token, \
         tracking_token, accompanying_guests_count, sent_at, opened_at, email_sent_at, \
         whatsapp_sent_at, created_at, updated_at"
    };
}

macro_rules! accompanying_columns {
    () => {
        "id, invitation_id, first_name, last_name, funktion, email, check_in_token, \
         arrived_at, created_at"
    };
}

macro_rules! audit_columns {
    () => {
        "id, entity_type, entity_id, action, old_values, new_values, event_id, user_id, \
         created_at"
    };
}

pub(crate) use {accompanying_columns, audit_columns, guest_columns, invitation_columns};

fn corrupt(what: &str, id: Uuid, error: &GuestlistError) -> GuestlistError {
    GuestlistError::Persistence(format!("corrupt {what} row {id}: {error}"))
}

#[derive(sqlx::FromRow)]
pub(crate) struct EventRow {
    id: Uuid,
    title: String,
    starts_at: Option<DateTime<Utc>>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self { id: EventId::from_uuid(row.id), title: row.title, starts_at: row.starts_at }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct GuestRow {
    id: Uuid,
    event_id: Uuid,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    organization: Option<String>,
    status: String,
    check_in_token: Option<String>,
    additional_data: String,
    table_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GuestRow> for Guest {
    type Error = GuestlistError;

    fn try_from(row: GuestRow) -> Result<Self> {
        let status = row.status.parse().map_err(|e| corrupt("guest", row.id, &e))?;
        let additional_data = AttributeBag::parse(&row.additional_data).unwrap_or_else(|e| {
            tracing::warn!(
                guest_id = %row.id,
                error = %e,
                "Stored attribute bag is unreadable; attribute writes for this guest are skipped"
            );
            AttributeBag::unreadable(row.additional_data.clone())
        });
        Ok(Self {
            id: GuestId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            organization: row.organization,
            status,
            check_in_token: row.check_in_token.map(OpaqueToken::from_raw),
            additional_data,
            table_number: row.table_number,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct InvitationRow {
    id: Uuid,
    guest_id: Uuid,
    event_id: Uuid,
    response: String,
    responded_at: Option<DateTime<Utc>>,
    accept_token: String,
    decline_token: String,
    tracking_token: String,
    accompanying_guests_count: i32,
    sent_at: Option<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
    email_sent_at: Option<DateTime<Utc>>,
    whatsapp_sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = GuestlistError;

    fn try_from(row: InvitationRow) -> Result<Self> {
        let response = row.response.parse().map_err(|e| corrupt("invitation", row.id, &e))?;
        let accompanying_guests_count = u32::try_from(row.accompanying_guests_count)
            .map_err(|_| {
                GuestlistError::Persistence(format!("negative party size on invitation {}", row.id))
            })?;
        Ok(Self {
            id: InvitationId::from_uuid(row.id),
            guest_id: GuestId::from_uuid(row.guest_id),
            event_id: EventId::from_uuid(row.event_id),
            response,
            responded_at: row.responded_at,
            accept_token: OpaqueToken::from_raw(row.accept_token),
            decline_token: OpaqueToken::from_raw(row.decline_token),
            tracking_token: OpaqueToken::from_raw(row.tracking_token),
            accompanying_guests_count,
            sent_at: row.sent_at,
            opened_at: row.opened_at,
            email_sent_at: row.email_sent_at,
            whatsapp_sent_at: row.whatsapp_sent_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AccompanyingRow {
    id: Uuid,
    invitation_id: Uuid,
    first_name: String,
    last_name: String,
    funktion: Option<String>,
    email: Option<String>,
    check_in_token: String,
    arrived_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<AccompanyingRow> for AccompanyingGuest {
    fn from(row: AccompanyingRow) -> Self {
        Self {
            id: AccompanyingGuestId::from_uuid(row.id),
            invitation_id: InvitationId::from_uuid(row.invitation_id),
            first_name: row.first_name,
            last_name: row.last_name,
            funktion: row.funktion,
            email: row.email,
            check_in_token: OpaqueToken::from_raw(row.check_in_token),
            arrived_at: row.arrived_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct AuditRow {
    id: i64,
    entity_type: String,
    entity_id: Uuid,
    action: String,
    old_values: Option<serde_json::Value>,
    new_values: Option<serde_json::Value>,
    event_id: Uuid,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = GuestlistError;

    fn try_from(row: AuditRow) -> Result<Self> {
        let as_persistence =
            |e: GuestlistError| GuestlistError::Persistence(format!("audit entry {}: {e}", row.id));
        Ok(Self {
            id: row.id,
            entity_type: row.entity_type.parse().map_err(as_persistence)?,
            entity_id: row.entity_id,
            action: row.action.parse().map_err(as_persistence)?,
            old_values: row.old_values,
            new_values: row.new_values,
            event_id: EventId::from_uuid(row.event_id),
            user_id: row.user_id.map(UserId::from_uuid),
            created_at: row.created_at,
        })
    }
}

/// Converts a list of fallible rows.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = GuestlistError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// Party size as stored.
pub(crate) fn party_size(invitation: &Invitation) -> Result<i32> {
    i32::try_from(invitation.accompanying_guests_count).map_err(|_| {
        GuestlistError::Validation(format!(
            "party size {} is out of range",
            invitation.accompanying_guests_count
        ))
    })
}
