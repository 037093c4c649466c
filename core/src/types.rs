//! Identifiers, entities and request payloads.
//!
//! Entities serialize to camelCase JSON; enum values use the upper-case
//! wire spelling (`PENDING`, `ACCEPTED`, ...) that is also stored in the
//! database.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::attributes::AttributeBag;
use crate::error::GuestlistError;
use crate::tokens::{AcceptToken, CheckInToken, DeclineToken, TokenIssuer, TrackingToken};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for an event.
    EventId
);
uuid_id!(
    /// Unique identifier for a guest.
    GuestId
);
uuid_id!(
    /// Unique identifier for an invitation.
    InvitationId
);
uuid_id!(
    /// Unique identifier for an accompanying guest.
    AccompanyingGuestId
);
uuid_id!(
    /// Unique identifier for an organizer account.
    UserId
);

/// An authenticated organizer performing an administrative operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    /// Account acting on the event.
    pub user_id: UserId,
}

impl Actor {
    /// Creates an actor for the given account.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

// ═══════════════════════════════════════════════════════════
// Enumerations
// ═══════════════════════════════════════════════════════════

/// State of an invitation's RSVP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsvpResponse {
    /// No answer yet.
    Pending,
    /// The guest will attend.
    Accepted,
    /// The guest will not attend.
    Declined,
}

impl RsvpResponse {
    /// Wire and storage spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
        }
    }

    /// Returns `true` once the guest has answered.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RsvpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsvpResponse {
    type Err = GuestlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "DECLINED" => Ok(Self::Declined),
            other => Err(GuestlistError::Validation(format!("unknown response: {other}"))),
        }
    }
}

/// Guest-level mirror of the RSVP.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuestStatus {
    /// Invited, no answer yet.
    Invited,
    /// Accepted.
    Confirmed,
    /// Declined.
    Cancelled,
}

impl GuestStatus {
    /// Wire and storage spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invited => "INVITED",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuestStatus {
    type Err = GuestlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INVITED" => Ok(Self::Invited),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(GuestlistError::Validation(format!("unknown guest status: {other}"))),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Entities
// ═══════════════════════════════════════════════════════════

/// An event guests are invited to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Display title, used in notifications.
    pub title: String,
    /// Scheduled start, if known.
    pub starts_at: Option<DateTime<Utc>>,
}

/// A person on an event's guest list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    /// Guest identifier.
    pub id: GuestId,
    /// Event the guest belongs to.
    pub event_id: EventId,
    /// Full display name.
    pub name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Company or organization.
    pub organization: Option<String>,
    /// Mirror of the invitation's response.
    pub status: GuestStatus,
    /// Present iff the guest's invitation is `ACCEPTED`.
    pub check_in_token: Option<CheckInToken>,
    /// Free-form per-guest attributes (`Zusage`, `Anwesend`, ...).
    pub additional_data: AttributeBag,
    /// Seating assignment.
    pub table_number: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// The RSVP record for one guest at one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    /// Invitation identifier.
    pub id: InvitationId,
    /// Invited guest.
    pub guest_id: GuestId,
    /// Event invited to.
    pub event_id: EventId,
    /// Current RSVP state.
    pub response: RsvpResponse,
    /// When the current response was recorded.
    pub responded_at: Option<DateTime<Utc>>,
    /// Token behind the accept link.
    pub accept_token: AcceptToken,
    /// Token behind the decline link.
    pub decline_token: DeclineToken,
    /// Token embedded in the tracking pixel.
    pub tracking_token: TrackingToken,
    /// Declared party size excluding the main guest.
    pub accompanying_guests_count: u32,
    /// When the invitation was sent by any channel.
    pub sent_at: Option<DateTime<Utc>>,
    /// First time the tracking pixel was fetched.
    pub opened_at: Option<DateTime<Utc>>,
    /// When the invitation email went out.
    pub email_sent_at: Option<DateTime<Utc>>,
    /// When the invitation WhatsApp message went out.
    pub whatsapp_sent_at: Option<DateTime<Utc>>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    /// Creates a `PENDING` invitation with freshly issued tokens.
    #[must_use]
    pub fn issue(
        guest_id: GuestId,
        event_id: EventId,
        accompanying_guests_count: u32,
        issuer: &TokenIssuer,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvitationId::new(),
            guest_id,
            event_id,
            response: RsvpResponse::Pending,
            responded_at: None,
            accept_token: issuer.issue(),
            decline_token: issuer.issue(),
            tracking_token: issuer.issue(),
            accompanying_guests_count,
            sent_at: None,
            opened_at: None,
            email_sent_at: None,
            whatsapp_sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Someone attending alongside the main guest of an invitation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccompanyingGuest {
    /// Accompanying guest identifier.
    pub id: AccompanyingGuestId,
    /// Owning invitation.
    pub invitation_id: InvitationId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Role or function, e.g. "Partner" or "Assistant".
    pub funktion: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Admits this person at the door.
    pub check_in_token: CheckInToken,
    /// Most recent successful check-in.
    pub arrived_at: Option<DateTime<Utc>>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

impl AccompanyingGuest {
    /// "First Last", trimmed.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_owned()
    }
}

/// Response counts for one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseCounts {
    /// Invitations in `ACCEPTED`.
    pub accepted: u64,
    /// Invitations in `DECLINED`.
    pub declined: u64,
    /// Invitations in `PENDING`.
    pub pending: u64,
}

/// An invitation together with its guest and party.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationDetails {
    /// The invitation.
    pub invitation: Invitation,
    /// The invited guest.
    pub guest: Guest,
    /// Accompanying guests attached to the invitation.
    pub accompanying_guests: Vec<AccompanyingGuest>,
}

// ═══════════════════════════════════════════════════════════
// Request Payloads
// ═══════════════════════════════════════════════════════════

/// One accompanying guest named on the accept form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMember {
    /// Given name.
    pub first_name: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Role or function.
    #[serde(default)]
    pub funktion: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
}

/// Party information submitted with an acceptance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyDeclaration {
    /// Number of accompanying guests. Defaults to the number of named
    /// members, or the invitation's current count when none are named.
    #[serde(default, alias = "accompanyingGuestsCount")]
    pub count: Option<u32>,
    /// Named accompanying guests.
    #[serde(default, alias = "accompanyingGuests")]
    pub members: Vec<PartyMember>,
}

/// Administrative edit of an invitation.
///
/// Timestamp fields distinguish "absent" (leave as is) from `null` (clear).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitationPatch {
    /// New RSVP state.
    #[serde(default)]
    pub response: Option<RsvpResponse>,
    /// Override for `respondedAt`.
    #[serde(default, deserialize_with = "double_option")]
    pub responded_at: Option<Option<DateTime<Utc>>>,
    /// Override for `sentAt`.
    #[serde(default, deserialize_with = "double_option")]
    pub sent_at: Option<Option<DateTime<Utc>>>,
    /// Override for `emailSentAt`.
    #[serde(default, deserialize_with = "double_option")]
    pub email_sent_at: Option<Option<DateTime<Utc>>>,
    /// Override for `whatsappSentAt`.
    #[serde(default, deserialize_with = "double_option")]
    pub whatsapp_sent_at: Option<Option<DateTime<Utc>>>,
    /// New declared party size.
    #[serde(default)]
    pub accompanying_guests_count: Option<u32>,
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A guest added at the door or by an organizer, already accepted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkIn {
    /// Full display name.
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Company or organization.
    #[serde(default)]
    pub organization: Option<String>,
    /// Declared party size; defaults to the number of named companions.
    #[serde(default)]
    pub accompanying_guests_count: Option<u32>,
    /// Named accompanying guests.
    #[serde(default)]
    pub accompanying_guests: Vec<PartyMember>,
    /// Mark the guest present immediately.
    #[serde(default)]
    pub check_in_now: bool,
}
