use emotebase_core::{ObjectId, ObjectKind};

use super::ChangeSet;
use crate::message::Message;

/// Builder over a message about to be sent
#[derive(Debug, Clone)]
pub struct MessageBuilder<D> {
    message: Message<D>,
    changes: ChangeSet,
}

impl<D> MessageBuilder<D> {
    /// Start building `message`
    pub fn new(message: Message<D>) -> Self {
        let changes = ChangeSet::new(ObjectKind::Message, message.id);
        Self { message, changes }
    }

    /// The message
    pub fn message(&self) -> &Message<D> {
        &self.message
    }

    /// Consume the builder
    pub fn into_message(self) -> Message<D> {
        self.message
    }

    /// Staged change set
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
        self.message.id = id;
        self.changes.set_id(id);
    }
}
