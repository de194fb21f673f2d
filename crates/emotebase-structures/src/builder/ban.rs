use chrono::{DateTime, Utc};
use emotebase_core::{ObjectId, ObjectKind};

use super::ChangeSet;
use crate::ban::{Ban, BanEffect};
use crate::changes::FieldValue;

/// Typed setters over a ban's change set
#[derive(Debug, Clone)]
pub struct BanBuilder {
    ban: Ban,
    changes: ChangeSet,
}

impl Default for BanBuilder {
    fn default() -> Self {
        Self::new(Ban::default())
    }
}

impl BanBuilder {
    /// Start building mutations for `ban`
    pub fn new(ban: Ban) -> Self {
        let changes = ChangeSet::new(ObjectKind::Ban, ban.id);
        Self { ban, changes }
    }

    /// The ban with staged mutations applied in memory
    pub fn ban(&self) -> &Ban {
        &self.ban
    }

    /// Consume the builder
    pub fn into_ban(self) -> Ban {
        self.ban
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

    /// Identity assigned by storage on insert
    pub fn assign_id(&mut self, id: ObjectId) {
        self.ban.id = id;
        self.changes.set_id(id);
    }

    /// The banned user
    pub fn set_victim_id(&mut self, id: ObjectId) -> &mut Self {
        self.changes.set_field(
            "victim_id",
            FieldValue::id(Some(self.ban.victim_id).filter(|id| !id.is_nil())),
            FieldValue::Id(id),
        );
        self.ban.victim_id = id;
        self
    }

    /// The user creating the ban
    pub fn set_actor_id(&mut self, id: ObjectId) -> &mut Self {
        self.changes.set_field(
            "actor_id",
            FieldValue::id(Some(self.ban.actor_id).filter(|id| !id.is_nil())),
            FieldValue::Id(id),
        );
        self.ban.actor_id = id;
        self
    }

    /// Why the ban was placed
    pub fn set_reason(&mut self, reason: impl Into<String>) -> &mut Self {
        let reason = reason.into();
        self.changes.set_field(
            "reason",
            FieldValue::String(self.ban.reason.clone()),
            FieldValue::String(reason.clone()),
        );
        self.ban.reason = reason;
        self
    }

    /// When the ban stops applying
    pub fn set_expire_at(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.changes.set_field(
            "expire_at",
            FieldValue::Timestamp(self.ban.expire_at),
            FieldValue::Timestamp(at),
        );
        self.ban.expire_at = at;
        self
    }

    /// What the ban does
    pub fn set_effects(&mut self, effects: BanEffect) -> &mut Self {
        self.changes.set_field(
            "effects",
            FieldValue::Bitmask(u64::from(self.ban.effects.bits())),
            FieldValue::Bitmask(u64::from(effects.bits())),
        );
        self.ban.effects = effects;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ban_fields_are_added() {
        let victim = ObjectId::new();
        let mut builder = BanBuilder::default();

        builder
            .set_victim_id(victim)
            .set_effects(BanEffect::NO_AUTH | BanEffect::NO_OWNERSHIP);

        let map = builder.changes().change_map(None);
        assert_eq!(map.field("victim_id").unwrap().old_value, FieldValue::Null);
        assert_eq!(map.field("effects").unwrap().new_value, FieldValue::Bitmask(6));
        assert!(builder.ban().has_effect(BanEffect::NO_AUTH));
    }

    #[test]
    fn test_assign_id_retargets_changes() {
        let mut builder = BanBuilder::default();
        let id = ObjectId::new();

        builder.assign_id(id);

        assert_eq!(builder.ban().id, id);
        assert_eq!(builder.changes().id(), id);
    }
}
