//! Messages and read-states

use chrono::{DateTime, Utc};
use emotebase_core::{ObjectId, ObjectKind};
use serde::{Deserialize, Serialize};

use crate::user::User;

/// Kinds of message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Direct inbox message
    Inbox,
    /// Everyone-visible announcement
    News,
    /// Request for moderator attention on an object
    ModRequest,
}

impl MessageKind {
    /// Stable wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "INBOX",
            Self::News => "NEWS",
            Self::ModRequest => "MOD_REQUEST",
        }
    }
}

impl From<MessageKind> for serde_json::Value {
    fn from(kind: MessageKind) -> Self {
        serde_json::Value::String(kind.as_str().to_string())
    }
}

/// A message with a kind-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<D> {
    /// Identity; nil until inserted
    #[serde(rename = "_id", default, skip_serializing_if = "ObjectId::is_nil")]
    pub id: ObjectId,
    /// Kind
    pub kind: MessageKind,
    /// Sender
    pub author_id: ObjectId,
    /// When the message was created
    pub created_at: DateTime<Utc>,
    /// Kind-specific payload
    pub data: D,

    // Relational
    /// Resolved sender
    #[serde(skip)]
    pub author: Option<User>,
}

impl<D> Message<D> {
    /// A message not yet inserted
    pub fn new(kind: MessageKind, author_id: ObjectId, data: D) -> Self {
        Self {
            id: ObjectId::nil(),
            kind,
            author_id,
            created_at: Utc::now(),
            data,
            author: None,
        }
    }
}

/// Payload of a moderation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDataModRequest {
    /// Kind of the object to review
    pub target_kind: ObjectKind,
    /// Object to review; for emotes this may be a version id
    pub target_id: ObjectId,
    /// Free-form note from the sender
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wish: String,
}

/// A per-message acknowledgment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRead {
    /// Identity; nil until inserted
    #[serde(rename = "_id", default, skip_serializing_if = "ObjectId::is_nil")]
    pub id: ObjectId,
    /// Message acknowledged
    pub message_id: ObjectId,
    /// Kind of that message
    pub kind: MessageKind,
    /// Marked resolved
    #[serde(default)]
    pub read: bool,
    /// When the record was written
    pub timestamp: DateTime<Utc>,
}

impl MessageRead {
    /// Unread baseline record for a freshly inserted message
    pub fn baseline(message_id: ObjectId, kind: MessageKind) -> Self {
        Self {
            id: ObjectId::nil(),
            message_id,
            kind,
            read: false,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninserted_message_omits_id() {
        let msg = Message::new(
            MessageKind::ModRequest,
            ObjectId::new(),
            MessageDataModRequest {
                target_kind: ObjectKind::Emote,
                target_id: ObjectId::new(),
                wish: String::new(),
            },
        );
        let json = serde_json::to_value(&msg).unwrap();

        assert!(json.get("_id").is_none());
        assert_eq!(json["kind"], serde_json::json!("MOD_REQUEST"));
        assert_eq!(json["data"]["target_kind"], serde_json::json!("EMOTE"));
    }
}
