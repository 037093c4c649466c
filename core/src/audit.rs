//! Audit trail of entity mutations.
//!
//! Every write to a guest, invitation or accompanying guest appends an entry
//! holding JSON snapshots of the row before and after the change. The
//! column revert reads the `old_values` of `UPDATE` entries back.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::attributes::AttributeBag;
use crate::error::GuestlistError;
use crate::types::{Actor, EventId, UserId};

/// Kind of entity an entry refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// A guest row.
    Guest,
    /// An invitation row.
    Invitation,
    /// An accompanying guest row.
    AccompanyingGuest,
}

impl EntityType {
    /// Storage spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "GUEST",
            Self::Invitation => "INVITATION",
            Self::AccompanyingGuest => "ACCOMPANYING_GUEST",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = GuestlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GUEST" => Ok(Self::Guest),
            "INVITATION" => Ok(Self::Invitation),
            "ACCOMPANYING_GUEST" => Ok(Self::AccompanyingGuest),
            other => Err(GuestlistError::Validation(format!("unknown entity type: {other}"))),
        }
    }
}

/// What happened to the entity.
///
/// Writes made by the revert engine are recorded as `Revert` so that they
/// never become the "latest update" a later column revert would restore.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Row inserted.
    Create,
    /// Row modified by a regular operation.
    Update,
    /// Row removed.
    Delete,
    /// Row modified by a revert.
    Revert,
}

impl AuditAction {
    /// Storage spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Revert => "REVERT",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = GuestlistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            "REVERT" => Ok(Self::Revert),
            other => Err(GuestlistError::Validation(format!("unknown audit action: {other}"))),
        }
    }
}

/// Who caused a mutation and in which event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuditContext {
    /// Event the mutation belongs to.
    pub event_id: EventId,
    /// Organizer behind the change; `None` for guest self-service.
    pub user_id: Option<UserId>,
    /// Time the entry is stamped with.
    pub at: DateTime<Utc>,
}

impl AuditContext {
    /// Context for a guest-initiated change (token links, check-in).
    #[must_use]
    pub const fn anonymous(event_id: EventId, at: DateTime<Utc>) -> Self {
        Self { event_id, user_id: None, at }
    }

    /// Context for an organizer-initiated change.
    #[must_use]
    pub const fn by(actor: Option<&Actor>, event_id: EventId, at: DateTime<Utc>) -> Self {
        let user_id = match actor {
            Some(actor) => Some(actor.user_id),
            None => None,
        };
        Self { event_id, user_id, at }
    }
}

/// An entry about to be appended.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAuditEntry {
    /// Entity kind.
    pub entity_type: EntityType,
    /// Entity id.
    pub entity_id: Uuid,
    /// Kind of change.
    pub action: AuditAction,
    /// Snapshot before the change.
    pub old_values: Option<Value>,
    /// Snapshot after the change.
    pub new_values: Option<Value>,
    /// Owning event.
    pub event_id: EventId,
    /// Organizer behind the change.
    pub user_id: Option<UserId>,
    /// Entry timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewAuditEntry {
    /// Records an insert.
    pub fn created<T: Serialize>(
        entity_type: EntityType,
        entity_id: Uuid,
        new: &T,
        ctx: &AuditContext,
    ) -> Self {
        Self::build(entity_type, entity_id, AuditAction::Create, None, snapshot(new), ctx)
    }

    /// Records a modification with before and after snapshots.
    pub fn changed<T: Serialize>(
        entity_type: EntityType,
        entity_id: Uuid,
        action: AuditAction,
        old: &T,
        new: &T,
        ctx: &AuditContext,
    ) -> Self {
        Self::build(entity_type, entity_id, action, snapshot(old), snapshot(new), ctx)
    }

    /// Records a removal; only the "before" snapshot is kept.
    pub fn removed<T: Serialize>(
        entity_type: EntityType,
        entity_id: Uuid,
        old: &T,
        ctx: &AuditContext,
    ) -> Self {
        Self::build(entity_type, entity_id, AuditAction::Delete, snapshot(old), None, ctx)
    }

    const fn build(
        entity_type: EntityType,
        entity_id: Uuid,
        action: AuditAction,
        old_values: Option<Value>,
        new_values: Option<Value>,
        ctx: &AuditContext,
    ) -> Self {
        Self {
            entity_type,
            entity_id,
            action,
            old_values,
            new_values,
            event_id: ctx.event_id,
            user_id: ctx.user_id,
            created_at: ctx.at,
        }
    }
}

fn snapshot<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

/// A persisted entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Monotonic sequence number; breaks `created_at` ties.
    pub id: i64,
    /// Entity kind.
    pub entity_type: EntityType,
    /// Entity id.
    pub entity_id: Uuid,
    /// Kind of change.
    pub action: AuditAction,
    /// Snapshot before the change.
    pub old_values: Option<Value>,
    /// Snapshot after the change.
    pub new_values: Option<Value>,
    /// Owning event.
    pub event_id: EventId,
    /// Organizer behind the change.
    pub user_id: Option<UserId>,
    /// Entry timestamp.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Attribute bag as it was before the change.
    ///
    /// Accepts `additionalData` stored either as a JSON object or as JSON
    /// text. `None` when the snapshot is missing or unparsable.
    #[must_use]
    pub fn previous_attributes(&self) -> Option<AttributeBag> {
        match self.old_values.as_ref()?.get("additionalData")? {
            Value::String(text) => AttributeBag::parse(text).ok(),
            object @ Value::Object(_) => AttributeBag::from_json(object.clone()),
            _ => None,
        }
    }
}

/// Filter for audit reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuditQuery {
    /// Restrict to one event.
    pub event_id: Option<EventId>,
    /// Restrict to one entity kind.
    pub entity_type: Option<EntityType>,
    /// Restrict to one action.
    pub action: Option<AuditAction>,
    /// Only entries at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl AuditQuery {
    /// Guest updates in `event_id` since `since`.
    #[must_use]
    pub const fn guest_updates(event_id: EventId, since: DateTime<Utc>) -> Self {
        Self {
            event_id: Some(event_id),
            entity_type: Some(EntityType::Guest),
            action: Some(AuditAction::Update),
            since: Some(since),
        }
    }

    /// `true` if `entry` passes every filter.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.event_id.is_none_or(|id| entry.event_id == id)
            && self.entity_type.is_none_or(|t| entry.entity_type == t)
            && self.action.is_none_or(|a| entry.action == a)
            && self.since.is_none_or(|since| entry.created_at >= since)
    }
}

/// Most recent entry per entity, newest first.
///
/// Ordering is `created_at` descending with the sequence id as tie-break.
#[must_use]
pub fn latest_per_entity(entries: &[AuditEntry]) -> Vec<&AuditEntry> {
    let mut ordered: Vec<&AuditEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let mut seen = HashSet::new();
    ordered.retain(|entry| seen.insert(entry.entity_id));
    ordered
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn entry(id: i64, entity: Uuid, minute: u32, old: Option<Value>) -> AuditEntry {
        AuditEntry {
            id,
            entity_type: EntityType::Guest,
            entity_id: entity,
            action: AuditAction::Update,
            old_values: old,
            new_values: None,
            event_id: EventId::from_uuid(Uuid::nil()),
            user_id: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn latest_wins_and_ties_break_on_sequence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let entries = vec![
            entry(1, a, 0, None),
            entry(2, a, 5, None),
            entry(3, b, 5, None),
            entry(4, b, 5, None),
        ];

        let latest = latest_per_entity(&entries);
        let ids: Vec<i64> = latest.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 2]);
    }

    #[test]
    fn previous_attributes_accepts_object_and_text() {
        let object = entry(1, Uuid::new_v4(), 0, Some(json!({"additionalData": {"Zusage": true}})));
        let text = entry(2, Uuid::new_v4(), 0, Some(json!({"additionalData": "{\"Zusage\": true}"})));

        assert!(object.previous_attributes().unwrap().flag("Zusage"));
        assert!(text.previous_attributes().unwrap().flag("Zusage"));
    }

    #[test]
    fn previous_attributes_is_none_for_garbage() {
        let missing = entry(1, Uuid::new_v4(), 0, None);
        let no_bag = entry(2, Uuid::new_v4(), 0, Some(json!({"name": "x"})));
        let bad_text = entry(3, Uuid::new_v4(), 0, Some(json!({"additionalData": "{nope"})));

        assert!(missing.previous_attributes().is_none());
        assert!(no_bag.previous_attributes().is_none());
        assert!(bad_text.previous_attributes().is_none());
    }

    #[test]
    fn query_filters_by_window() {
        let e = entry(1, Uuid::new_v4(), 10, None);
        let mut query = AuditQuery::guest_updates(e.event_id, e.created_at);
        assert!(query.matches(&e));

        query.since = Some(e.created_at + chrono::Duration::seconds(1));
        assert!(!query.matches(&e));
    }
}
