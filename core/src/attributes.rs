//! The per-guest attribute bag.
//!
//! Organizers keep arbitrary columns per guest; a handful of them carry
//! RSVP and attendance meaning and are written by the state machine (see
//! [`keys`]). The bag is stored as JSON text. Values the state machine does
//! not own are carried through verbatim: strings stay strings, nested arrays
//! and objects stay JSON, and keys keep their stored order. Timestamps are
//! only interpreted through [`AttributeBag::timestamp`].
//!
//! Stored text that is not a JSON object still loads, as an
//! [unreadable](AttributeBag::unreadable) bag: it reads as empty, refuses
//! every write and serializes back to the original text.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::Value;

use crate::error::{GuestlistError, Result};

/// Attribute names with RSVP or attendance meaning.
pub mod keys {
    /// `true` once the guest accepted.
    pub const ACCEPTED: &str = "Zusage";
    /// When the guest accepted.
    pub const ACCEPTED_AT: &str = "Zusage Datum";
    /// `true` once the guest declined.
    pub const DECLINED: &str = "Absage";
    /// When the guest declined.
    pub const DECLINED_AT: &str = "Absage Datum";
    /// `true` once the guest checked in.
    pub const PRESENT: &str = "Anwesend";
    /// When the guest checked in.
    pub const PRESENT_AT: &str = "Anwesend Datum";
    /// Organizer-maintained "attending" column.
    pub const ATTENDING: &str = "Nimmt teil";
    /// Organizer-maintained "not attending" column.
    pub const NOT_ATTENDING: &str = "Nimmt nicht teil";
    /// Organizer-maintained invitation list membership.
    pub const INVITATION_LIST: &str = "Einladungsliste";
}

/// Keys restored by the column revert. Nothing else is ever touched by it.
pub const REVERTIBLE_KEYS: [&str; 5] = [
    keys::ACCEPTED,
    keys::DECLINED,
    keys::ATTENDING,
    keys::NOT_ATTENDING,
    keys::INVITATION_LIST,
];

/// A single attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    /// Boolean flag.
    Bool(bool),
    /// Free text, kept exactly as stored.
    Text(String),
    /// A point in time written by the state machine.
    Timestamp(DateTime<Utc>),
    /// Any JSON number.
    Number(serde_json::Number),
    /// A nested array or object.
    Json(Value),
    /// Explicit `null`.
    Null,
}

impl AttributeValue {
    /// Wraps a JSON value without reinterpreting it.
    #[must_use]
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => Self::Json(nested),
        }
    }

    /// Back to JSON. Timestamps are written as RFC 3339 UTC with
    /// milliseconds.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Text(s) => Value::String(s.clone()),
            Self::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Number(n) => Value::Number(n.clone()),
            Self::Json(v) => v.clone(),
        }
    }

    /// Lenient truthiness: `true` or the text `"true"` (any case).
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// The instant this value holds, if it is a timestamp or RFC 3339 text.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            Self::Text(s) => {
                DateTime::parse_from_rfc3339(s.trim()).ok().map(|ts| ts.with_timezone(&Utc))
            }
            _ => None,
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

/// Insertion-ordered map of attribute name to value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeBag {
    entries: IndexMap<String, AttributeValue>,
    unreadable: Option<String>,
}

impl AttributeBag {
    /// Empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the stored JSON text. Blank text is an empty bag.
    ///
    /// # Errors
    ///
    /// Returns [`GuestlistError::Validation`] if the text is not a JSON
    /// object.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value = serde_json::from_str(text)
            .map_err(|e| GuestlistError::Validation(format!("attribute bag is not JSON: {e}")))?;
        Self::from_json(value)
            .ok_or_else(|| GuestlistError::Validation("attribute bag is not a JSON object".into()))
    }

    /// A bag whose stored text could not be parsed.
    ///
    /// It reads as empty, ignores every write and serializes back to `raw`,
    /// so saving the guest leaves the stored text as it was.
    #[must_use]
    pub fn unreadable(raw: impl Into<String>) -> Self {
        Self { entries: IndexMap::new(), unreadable: Some(raw.into()) }
    }

    /// `false` for a bag built by [`AttributeBag::unreadable`].
    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.unreadable.is_none()
    }

    /// Builds a bag from a JSON object, `None` for any other JSON shape.
    #[must_use]
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(
                map.into_iter().map(|(k, v)| (k, AttributeValue::from_json(v))).collect(),
            ),
            _ => None,
        }
    }

    /// Serializes to the stored JSON text.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        if let Some(raw) = &self.unreadable {
            return raw.clone();
        }
        let map: serde_json::Map<String, Value> =
            self.entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
        Value::Object(map).to_string()
    }

    /// Value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.get(key)
    }

    /// Sets `key`, returning `true` if the stored value changed.
    ///
    /// New keys go to the end; existing keys keep their position. An
    /// unreadable bag is left alone and reports no change.
    pub fn set(&mut self, key: &str, value: AttributeValue) -> bool {
        if !self.is_readable() || self.entries.get(key) == Some(&value) {
            return false;
        }
        self.entries.insert(key.to_owned(), value);
        true
    }

    /// Removes `key`, returning the old value. Other keys keep their order.
    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.entries.shift_remove(key)
    }

    /// Lenient flag read; absent keys are `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(AttributeValue::is_truthy)
    }

    /// Instant stored under `key`, read from a timestamp or RFC 3339 text.
    #[must_use]
    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).and_then(AttributeValue::as_timestamp)
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates attributes in stored order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Records an acceptance.
    pub fn mark_accepted(&mut self, at: DateTime<Utc>) {
        self.set(keys::ACCEPTED, AttributeValue::Bool(true));
        self.set(keys::DECLINED, AttributeValue::Bool(false));
        self.set(keys::ACCEPTED_AT, AttributeValue::Timestamp(at));
    }

    /// Records a decline.
    pub fn mark_declined(&mut self, at: DateTime<Utc>) {
        self.set(keys::DECLINED, AttributeValue::Bool(true));
        self.set(keys::ACCEPTED, AttributeValue::Bool(false));
        self.set(keys::DECLINED_AT, AttributeValue::Timestamp(at));
    }

    /// Records presence. Returns `false` (and changes nothing) if the guest
    /// was already present.
    pub fn mark_present(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_readable() || self.flag(keys::PRESENT) {
            return false;
        }
        self.set(keys::PRESENT, AttributeValue::Bool(true));
        self.set(keys::PRESENT_AT, AttributeValue::Timestamp(at));
        true
    }

    /// Clears presence. Returns `true` if anything changed.
    pub fn mark_absent(&mut self) -> bool {
        let flag_changed = self.set(keys::PRESENT, AttributeValue::Bool(false));
        let date_removed = self.remove(keys::PRESENT_AT).is_some();
        flag_changed || date_removed
    }

    /// Copies `keys` from `snapshot` into this bag.
    ///
    /// Keys present in the snapshot are overwritten with the snapshot value;
    /// keys missing from it are left alone. Returns `true` if any value
    /// changed.
    pub fn restore_from(&mut self, snapshot: &Self, keys: &[&str]) -> bool {
        let mut changed = false;
        for key in keys {
            if let Some(value) = snapshot.get(key) {
                changed |= self.set(key, value.clone());
            }
        }
        changed
    }

    /// `true` if the bag holds at least one of `keys`.
    #[must_use]
    pub fn contains_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.entries.contains_key(*k))
    }
}

impl Serialize for AttributeBag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.unreadable {
            Some(raw) => serializer.serialize_str(raw),
            None => self.entries.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AttributeBag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Self::new()),
            Value::String(text) => Ok(Self::parse(&text).unwrap_or_else(|_| Self::unreadable(text))),
            other => Self::from_json(other)
                .ok_or_else(|| de::Error::custom("attribute bag must be a JSON object")),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, AttributeValue)> for AttributeBag {
    fn from_iter<I: IntoIterator<Item = (K, AttributeValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            unreadable: None,
        }
    }
}
