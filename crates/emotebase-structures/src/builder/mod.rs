//! Change-set builder and typed entity builders
//!
//! A [`ChangeSet`] accumulates field-level mutations for one target without
//! touching storage. Each setter classifies the field against its value before
//! the first mutation: absent to present is *added*, present to absent is
//! *removed*, anything else that differs is *updated*. Setting a field to the
//! value it already holds records nothing, so replaying a setter is harmless.
//!
//! Once a builder has been applied to storage it is marked tainted and every
//! engine operation refuses it.

mod ban;
mod emote;
mod message;

pub use ban::BanBuilder;
pub use emote::EmoteBuilder;
pub use message::MessageBuilder;

use emotebase_core::{EmoteError, ObjectId, ObjectKind, Result, UpdateDoc};
use serde_json::Value;

use crate::changes::{ChangeField, ChangeMap, FieldValue};

/// Pending mutations for one entity
#[derive(Debug, Clone)]
pub struct ChangeSet {
    id: ObjectId,
    kind: ObjectKind,
    update: UpdateDoc,
    added: Vec<ChangeField>,
    updated: Vec<ChangeField>,
    removed: Vec<ChangeField>,
    tainted: bool,
}

impl ChangeSet {
    /// Empty change set for the given target
    pub fn new(kind: ObjectKind, id: ObjectId) -> Self {
        Self {
            id,
            kind,
            update: UpdateDoc::new(),
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            tainted: false,
        }
    }

    /// Record `key` moving from `current` to `next`
    ///
    /// Returns whether anything was staged.
    pub fn set_field(&mut self, key: &str, current: FieldValue, next: FieldValue) -> bool {
        if current == next {
            return false;
        }

        if next.is_null() {
            self.update.unset(key);
        } else {
            self.update.set(key, next.to_value());
        }

        let original = self.take_entry(key).unwrap_or(current);
        if original == next {
            return true;
        }

        let entry = ChangeField {
            key: key.to_string(),
            old_value: original,
            new_value: next,
        };
        match (entry.old_value.is_null(), entry.new_value.is_null()) {
            (true, _) => self.added.push(entry),
            (false, true) => self.removed.push(entry),
            (false, false) => self.updated.push(entry),
        }
        true
    }

    fn take_entry(&mut self, key: &str) -> Option<FieldValue> {
        for list in [&mut self.added, &mut self.updated, &mut self.removed] {
            if let Some(pos) = list.iter().position(|f| f.key == key) {
                return Some(list.remove(pos).old_value);
            }
        }
        None
    }

    /// Target identity
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Target kind
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Re-point the change set at a newly assigned identity
    pub fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    /// Persistence directive staged so far
    pub fn update(&self) -> &UpdateDoc {
        &self.update
    }

    /// Whether no field has been staged
    pub fn is_empty(&self) -> bool {
        self.update.is_empty()
    }

    /// Change-record for the staged mutations
    pub fn change_map(&self, object: Option<Value>) -> ChangeMap {
        ChangeMap {
            id: self.id,
            kind: self.kind,
            added: self.added.clone(),
            updated: self.updated.clone(),
            removed: self.removed.clone(),
            object,
        }
    }

    /// Whether the change set has been applied
    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    /// Mark the change set as applied
    pub fn mark_tainted(&mut self) {
        self.tainted = true;
    }

    /// Fail with `TaintedObject` when already applied
    pub fn ensure_untainted(&self) -> Result<()> {
        if self.tainted {
            return Err(EmoteError::tainted_object(format!(
                "{} builder for {} was already applied",
                self.kind, self.id
            )));
        }
        Ok(())
    }
}
