//! Identifier types
//!
//! `ObjectId` wraps a version 7 UUID. The v7 layout puts a millisecond timestamp
//! in the high bits, so ordering ids (or their hyphenated string form) orders
//! documents by creation time; "newest first" sorts rely on this.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identity of a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Generate a new time-ordered identifier
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The zero identifier, used for documents not yet inserted
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the zero identifier
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ObjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<ObjectId> for serde_json::Value {
    fn from(id: ObjectId) -> Self {
        serde_json::Value::String(id.to_string())
    }
}

/// The kind of an object, used for change-records and message targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    /// A user account
    User,
    /// A single emote (asset)
    Emote,
    /// A collection of emotes
    EmoteSet,
    /// A role granting permissions
    Role,
    /// An entitlement granted to a user
    Entitlement,
    /// A ban placed on a user
    Ban,
    /// An inbox or moderation message
    Message,
    /// A user-submitted report
    Report,
}

impl ObjectKind {
    /// Collection that stores objects of this kind
    pub fn collection(self) -> Collection {
        match self {
            Self::User => Collection::Users,
            Self::Emote => Collection::Emotes,
            Self::EmoteSet => Collection::EmoteSets,
            Self::Role => Collection::Roles,
            Self::Entitlement => Collection::Entitlements,
            Self::Ban => Collection::Bans,
            Self::Message => Collection::Messages,
            Self::Report => Collection::Reports,
        }
    }

    /// Stable wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Emote => "EMOTE",
            Self::EmoteSet => "EMOTE_SET",
            Self::Role => "ROLE",
            Self::Entitlement => "ENTITLEMENT",
            Self::Ban => "BAN",
            Self::Message => "MESSAGE",
            Self::Report => "REPORT",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ObjectKind> for serde_json::Value {
    fn from(kind: ObjectKind) -> Self {
        serde_json::Value::String(kind.as_str().to_string())
    }
}

/// Named collections in the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// User accounts
    Users,
    /// Emotes
    Emotes,
    /// Emote sets
    EmoteSets,
    /// Roles
    Roles,
    /// Entitlements
    Entitlements,
    /// Bans
    Bans,
    /// Messages
    Messages,
    /// Per-reader message read states
    MessagesRead,
    /// Reports
    Reports,
}

impl Collection {
    /// Collection name as stored
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Emotes => "emotes",
            Self::EmoteSets => "emote_sets",
            Self::Roles => "roles",
            Self::Entitlements => "entitlements",
            Self::Bans => "bans",
            Self::Messages => "messages",
            Self::MessagesRead => "messages_read",
            Self::Reports => "reports",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_order_by_creation() {
        let first = ObjectId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ObjectId::new();

        assert!(first < second);
        assert!(first.to_string() < second.to_string());
    }

    #[test]
    fn test_nil_id() {
        assert!(ObjectId::nil().is_nil());
        assert!(!ObjectId::new().is_nil());
        assert_eq!(ObjectId::default(), ObjectId::nil());
    }

    #[test]
    fn test_id_round_trips_through_string() {
        let id = ObjectId::new();
        let parsed: ObjectId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_kind_collections() {
        assert_eq!(ObjectKind::Emote.collection(), Collection::Emotes);
        assert_eq!(ObjectKind::EmoteSet.collection().as_str(), "emote_sets");
        assert_eq!(
            serde_json::to_value(ObjectKind::EmoteSet).unwrap(),
            serde_json::Value::from(ObjectKind::EmoteSet)
        );
    }
}
