//! Emotes, their versioning records, and emote sets

use chrono::{DateTime, Utc};
use emotebase_core::ObjectId;
use serde::{Deserialize, Serialize};

use crate::user::User;

/// Lifecycle status of an emote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmoteStatus {
    /// Uploaded, not yet processed
    #[default]
    Pending,
    /// Being processed
    Processing,
    /// Visible and usable
    Live,
    /// Hidden by moderation
    Disabled,
    /// Processing failed
    Failed,
    /// Soft-deleted
    Deleted,
}

impl EmoteStatus {
    /// Stable wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Live => "LIVE",
            Self::Disabled => "DISABLED",
            Self::Failed => "FAILED",
            Self::Deleted => "DELETED",
        }
    }
}

impl From<EmoteStatus> for serde_json::Value {
    fn from(status: EmoteStatus) -> Self {
        serde_json::Value::String(status.as_str().to_string())
    }
}

/// Marks an emote as a version within another emote's lineage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmoteVersioning {
    /// Label of this version
    pub tag: String,
    /// Forked lineage; never promoted automatically
    pub diverged: bool,
    /// When the version was recorded
    pub timestamp: DateTime<Utc>,
}

/// A file revision embedded in an emote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmoteVersion {
    /// Identity of the revision
    pub id: ObjectId,
    /// Label
    #[serde(default)]
    pub name: String,
    /// When the revision was uploaded
    pub created_at: DateTime<Utc>,
}

/// A versioned asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Emote {
    /// Identity
    #[serde(rename = "_id", default)]
    pub id: ObjectId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Owning user; absent for unowned emotes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<ObjectId>,
    /// Lifecycle status
    #[serde(default)]
    pub status: EmoteStatus,
    /// Emote this one is a version of; absent for a lineage's current version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjectId>,
    /// Versioning record, present together with `parent_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning: Option<EmoteVersioning>,
    /// Embedded file revisions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<EmoteVersion>,

    // Relational
    /// Resolved owner
    #[serde(skip)]
    pub owner: Option<User>,
}

impl Emote {
    /// A live, unowned emote with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            status: EmoteStatus::Live,
            ..Self::default()
        }
    }

    /// Set the owner, builder-style
    pub fn owned_by(mut self, owner: ObjectId) -> Self {
        self.owner_id = Some(owner);
        self
    }

    /// Whether this emote is the current version of its lineage
    pub fn is_current(&self) -> bool {
        self.parent_id.is_none() && self.versioning.is_none()
    }

    /// Whether this emote is a divergent fork
    pub fn is_diverged(&self) -> bool {
        self.versioning.as_ref().is_some_and(|v| v.diverged)
    }
}

/// A collection of emotes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmoteSet {
    /// Identity
    #[serde(rename = "_id", default)]
    pub id: ObjectId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Owning user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<ObjectId>,
    /// Member emote ids
    #[serde(default)]
    pub emote_ids: Vec<ObjectId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_version_has_no_lineage_fields() {
        let emote = Emote::new("pepe");
        let json = serde_json::to_value(&emote).unwrap();

        assert!(emote.is_current());
        assert!(json.get("parent_id").is_none());
        assert!(json.get("versioning").is_none());
        assert_eq!(json["status"], serde_json::json!("LIVE"));
        assert_eq!(json["_id"], serde_json::json!(emote.id.to_string()));
    }

    #[test]
    fn test_decodes_sparse_document() {
        let id = ObjectId::new();
        let emote: Emote = serde_json::from_value(serde_json::json!({"_id": id})).unwrap();

        assert_eq!(emote.id, id);
        assert_eq!(emote.status, EmoteStatus::Pending);
        assert!(emote.owner_id.is_none());
    }
}
