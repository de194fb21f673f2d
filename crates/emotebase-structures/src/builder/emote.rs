use emotebase_core::{ObjectId, ObjectKind};
use serde_json::json;

use super::ChangeSet;
use crate::changes::FieldValue;
use crate::emote::{Emote, EmoteStatus, EmoteVersioning};

/// Typed setters over an emote's change set
#[derive(Debug, Clone)]
pub struct EmoteBuilder {
    emote: Emote,
    changes: ChangeSet,
}

impl EmoteBuilder {
    /// Start building mutations for `emote`
    pub fn new(emote: Emote) -> Self {
        let changes = ChangeSet::new(ObjectKind::Emote, emote.id);
        Self { emote, changes }
    }

    /// The emote with staged mutations applied in memory
    pub fn emote(&self) -> &Emote {
        &self.emote
    }

    /// Consume the builder
    pub fn into_emote(self) -> Emote {
        self.emote
    }

    /// Staged mutations
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Whether the builder has been applied
    pub fn is_tainted(&self) -> bool {
        self.changes.is_tainted()
    }

    /// Mark the builder as applied
    pub fn mark_tainted(&mut self) {
        self.changes.mark_tainted();
    }

    /// Display name
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        self.changes.set_field(
            "name",
            FieldValue::String(self.emote.name.clone()),
            FieldValue::String(name.clone()),
        );
        self.emote.name = name;
        self
    }

    /// Owning user
    pub fn set_owner_id(&mut self, owner_id: Option<ObjectId>) -> &mut Self {
        self.changes.set_field(
            "owner_id",
            FieldValue::id(self.emote.owner_id),
            FieldValue::id(owner_id),
        );
        self.emote.owner_id = owner_id;
        self
    }

    /// Lifecycle status
    pub fn set_status(&mut self, status: EmoteStatus) -> &mut Self {
        self.changes.set_field(
            "status",
            FieldValue::Enum(self.emote.status.as_str()),
            FieldValue::Enum(status.as_str()),
        );
        self.emote.status = status;
        self
    }

    /// Parent in the version graph
    pub fn set_parent_id(&mut self, parent_id: Option<ObjectId>) -> &mut Self {
        self.changes.set_field(
            "parent_id",
            FieldValue::id(self.emote.parent_id),
            FieldValue::id(parent_id),
        );
        self.emote.parent_id = parent_id;
        self
    }

    /// Versioning record
    pub fn set_versioning(&mut self, versioning: Option<EmoteVersioning>) -> &mut Self {
        self.changes.set_field(
            "versioning",
            versioning_value(self.emote.versioning.as_ref()),
            versioning_value(versioning.as_ref()),
        );
        self.emote.versioning = versioning;
        self
    }

    /// Replace the in-memory emote with the stored document after a write
    ///
    /// Relational fields already resolved on the builder are kept.
    pub fn refresh(&mut self, mut stored: Emote) {
        stored.owner = self.emote.owner.take();
        self.emote = stored;
    }
}

fn versioning_value(versioning: Option<&EmoteVersioning>) -> FieldValue {
    match versioning {
        Some(v) => FieldValue::Object(json!({
            "tag": v.tag,
            "diverged": v.diverged,
            "timestamp": FieldValue::Timestamp(v.timestamp).to_value(),
        })),
        None => FieldValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_setters_stage_and_apply() {
        let emote = Emote::new("pepe");
        let parent = ObjectId::new();
        let mut builder = EmoteBuilder::new(emote);

        builder
            .set_name("pepe2")
            .set_parent_id(Some(parent))
            .set_versioning(Some(EmoteVersioning {
                tag: "v2".into(),
                diverged: false,
                timestamp: Utc::now(),
            }));

        assert_eq!(builder.emote().parent_id, Some(parent));
        let update = builder.changes().update();
        assert_eq!(update.set["parent_id"], serde_json::Value::from(parent));
        assert_eq!(update.set["versioning"]["tag"], json!("v2"));

        let map = builder.changes().change_map(None);
        assert_eq!(map.added.len(), 2);
        assert_eq!(map.updated.len(), 1);
    }

    #[test]
    fn test_clearing_parent_stages_unset() {
        let mut emote = Emote::new("pepe");
        emote.parent_id = Some(ObjectId::new());
        let mut builder = EmoteBuilder::new(emote);

        builder.set_parent_id(None);

        assert!(builder.changes().update().unset.contains("parent_id"));
        assert_eq!(builder.changes().change_map(None).removed.len(), 1);
    }
}
