//! Change-records and event types
//!
//! A `ChangeMap` describes one mutation's field-level effect. Field values are
//! typed while the record is being built and serialize as plain JSON values.

use chrono::{DateTime, SecondsFormat, Utc};
use emotebase_core::{ObjectId, ObjectKind};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A typed field value carried by a change entry
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent
    Null,
    /// Text
    String(String),
    /// Object identity
    Id(ObjectId),
    /// Point in time
    Timestamp(DateTime<Utc>),
    /// Flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Permission or effect bits
    Bitmask(u64),
    /// Enumeration wire name
    Enum(&'static str),
    /// Embedded structure
    Object(Value),
}

impl FieldValue {
    /// Optional identity, `Null` when absent
    pub fn id(id: Option<ObjectId>) -> Self {
        id.map_or(Self::Null, Self::Id)
    }

    /// Whether the value is absent
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Stored representation
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::String(s) => Value::String(s.clone()),
            Self::Id(id) => (*id).into(),
            Self::Timestamp(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::from(*n),
            Self::Bitmask(bits) => Value::from(*bits),
            Self::Enum(name) => Value::String((*name).to_string()),
            Self::Object(v) => v.clone(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// One changed field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeField {
    /// Field path
    pub key: String,
    /// Value before the mutation
    pub old_value: FieldValue,
    /// Value after the mutation
    pub new_value: FieldValue,
}

/// Field-level description of one mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeMap {
    /// Target identity
    pub id: ObjectId,
    /// Target kind
    pub kind: ObjectKind,
    /// Fields that were absent before
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<ChangeField>,
    /// Fields whose value changed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updated: Vec<ChangeField>,
    /// Fields that were cleared
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<ChangeField>,
    /// Full object; only present on create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}

impl ChangeMap {
    /// Whether no field changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Entry for `key` in any list
    pub fn field(&self, key: &str) -> Option<&ChangeField> {
        self.added
            .iter()
            .chain(&self.updated)
            .chain(&self.removed)
            .find(|f| f.key == key)
    }
}

/// Name of a published event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// `system.*`
    AnySystem,
    /// `system.announcement`
    SystemAnnouncement,
    /// `emote.*`
    AnyEmote,
    /// `emote.create`
    CreateEmote,
    /// `emote.update`
    UpdateEmote,
    /// `emote.delete`
    DeleteEmote,
    /// `emote_set.*`
    AnyEmoteSet,
    /// `emote_set.create`
    CreateEmoteSet,
    /// `emote_set.update`
    UpdateEmoteSet,
    /// `emote_set.delete`
    DeleteEmoteSet,
    /// `user.*`
    AnyUser,
    /// `user.create`
    CreateUser,
    /// `user.update`
    UpdateUser,
    /// `user.delete`
    DeleteUser,
    /// `message.*`
    AnyMessage,
    /// `message.create`
    CreateMessage,
    /// `ban.*`
    AnyBan,
    /// `ban.create`
    CreateBan,
    /// `ban.update`
    UpdateBan,
}

impl EventType {
    /// Dotted wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnySystem => "system.*",
            Self::SystemAnnouncement => "system.announcement",
            Self::AnyEmote => "emote.*",
            Self::CreateEmote => "emote.create",
            Self::UpdateEmote => "emote.update",
            Self::DeleteEmote => "emote.delete",
            Self::AnyEmoteSet => "emote_set.*",
            Self::CreateEmoteSet => "emote_set.create",
            Self::UpdateEmoteSet => "emote_set.update",
            Self::DeleteEmoteSet => "emote_set.delete",
            Self::AnyUser => "user.*",
            Self::CreateUser => "user.create",
            Self::UpdateUser => "user.update",
            Self::DeleteUser => "user.delete",
            Self::AnyMessage => "message.*",
            Self::CreateMessage => "message.create",
            Self::AnyBan => "ban.*",
            Self::CreateBan => "ban.create",
            Self::UpdateBan => "ban.update",
        }
    }

    /// Part before the dot
    pub fn category(self) -> &'static str {
        self.as_str().split('.').next().unwrap_or_default()
    }

    /// Whether this is a `category.*` wildcard
    pub fn is_wildcard(self) -> bool {
        self.as_str().ends_with(".*")
    }

    /// Whether a subscription to `self` receives `event`
    pub fn matches(self, event: EventType) -> bool {
        if self.is_wildcard() {
            self.category() == event.category()
        } else {
            self == event
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_matching() {
        assert!(EventType::AnyEmote.matches(EventType::UpdateEmote));
        assert!(!EventType::AnyEmote.matches(EventType::UpdateEmoteSet));
        assert!(EventType::CreateBan.matches(EventType::CreateBan));
        assert!(!EventType::CreateBan.matches(EventType::UpdateBan));
        assert_eq!(EventType::AnyEmoteSet.category(), "emote_set");
    }

    #[test]
    fn test_change_map_shape() {
        let id = ObjectId::new();
        let change = ChangeMap {
            id,
            kind: ObjectKind::Emote,
            added: vec![ChangeField {
                key: "parent_id".into(),
                old_value: FieldValue::Null,
                new_value: FieldValue::Id(id),
            }],
            updated: Vec::new(),
            removed: Vec::new(),
            object: None,
        };
        let json = serde_json::to_value(&change).unwrap();

        assert_eq!(json["kind"], serde_json::json!("EMOTE"));
        assert_eq!(json["added"][0]["old_value"], Value::Null);
        assert_eq!(json["added"][0]["new_value"], serde_json::json!(id.to_string()));
        assert!(json.get("updated").is_none());
        assert!(json.get("object").is_none());
    }
}
