//! Reusable fixtures for engine and query tests
//!
//! Users carry their resolved roles in memory only. Seeding a user stores the
//! document with `role_ids`; tests pass the in-memory `User` as the actor.

use chrono::{Duration, Utc};
use emotebase_core::document::to_document;
use emotebase_core::{Collection, EngineConfig, ObjectId, ObjectKind};
use emotebase_mutations::{EmoteMutation, Mutate};
use emotebase_structures::{
    Ban, BanEffect, Emote, Entitlement, EntitlementData, EntitlementKind, Message,
    MessageDataModRequest, MessageKind, MessageRead, Role, RolePermission, User, UserEditor,
    UserEditorPermission,
};
use serde::Serialize;
use std::sync::Arc;

use crate::sink::RecordingChangeSink;
use crate::store::MemoryDocumentStore;

/// A user holding exactly `permissions` through a single role
pub fn user_with(username: &str, permissions: RolePermission) -> User {
    let role = Role {
        id: ObjectId::new(),
        name: format!("{username}-role"),
        position: 1,
        allowed: permissions,
        denied: RolePermission::NONE,
    };
    User {
        id: ObjectId::new(),
        username: username.to_string(),
        ..User::default()
    }
    .with_roles(vec![role])
}

/// A user allowed to edit emotes but nothing else
pub fn emote_editor(username: &str) -> User {
    user_with(username, RolePermission::EDIT_EMOTE)
}

/// A moderator of emotes, emote sets and reports
pub fn moderator(username: &str) -> User {
    user_with(
        username,
        RolePermission::EDIT_EMOTE
            | RolePermission::EDIT_ANY_EMOTE
            | RolePermission::EDIT_ANY_EMOTE_SET
            | RolePermission::MANAGE_REPORTS
            | RolePermission::MANAGE_BANS,
    )
}

/// Grant `editor` rights over `owner`'s objects
pub fn grant_editor(owner: &mut User, editor: &User, permissions: UserEditorPermission) {
    owner.editors.push(UserEditor {
        id: editor.id,
        permissions,
        visible: true,
        added_at: Utc::now(),
    });
}

/// A ban on `victim` that expires in a day
pub fn ban_for(victim: &User, effects: BanEffect) -> Ban {
    Ban {
        id: ObjectId::nil(),
        victim_id: victim.id,
        reason: "test ban".to_string(),
        expire_at: Utc::now() + Duration::days(1),
        effects,
        ..Ban::default()
    }
}

/// A moderation request from `author` about a target
pub fn mod_request(
    author: &User,
    target_kind: ObjectKind,
    target_id: ObjectId,
) -> Message<MessageDataModRequest> {
    Message::new(
        MessageKind::ModRequest,
        author.id,
        MessageDataModRequest {
            target_kind,
            target_id,
            wish: "please review".to_string(),
        },
    )
}

/// A mutation of `emote` by `actor`
pub fn mutation_by(emote: &Emote, actor: &User) -> EmoteMutation {
    EmoteMutation::new(emote.clone(), Some(actor.clone()))
}

/// Store, sink and engine wired together
#[derive(Debug)]
pub struct EngineFixture {
    /// Backing store
    pub store: Arc<MemoryDocumentStore>,
    /// Records every published change
    pub sink: RecordingChangeSink,
    /// The engine under test
    pub mutate: Mutate<MemoryDocumentStore>,
}

impl EngineFixture {
    /// Engine with default configuration over an empty store
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with the given configuration over an empty store
    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let sink = RecordingChangeSink::new();
        let mutate = Mutate::new(Arc::clone(&store), Arc::new(sink.clone()), config);
        Self {
            store,
            sink,
            mutate,
        }
    }

    /// Store a user together with its roles and role entitlements
    pub async fn seed_user(&self, user: &User) {
        self.store.seed_user(user).await;
    }

    /// Store an emote
    pub async fn seed_emote(&self, emote: &Emote) {
        self.store.seed_value(Collection::Emotes, emote).await;
    }
}

impl Default for EngineFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// Store a serializable value in a collection
    ///
    /// # Panics
    ///
    /// Panics if the value does not encode as a document.
    pub async fn seed_value<T: Serialize>(&self, collection: Collection, value: &T) -> ObjectId {
        let doc = to_document(value).expect("fixture encodes as a document");
        self.seed(collection, doc).await
    }

    /// Store a user, its roles and one `ROLE` entitlement per role
    pub async fn seed_user(&self, user: &User) {
        self.seed_value(Collection::Users, user).await;
        for role in &user.roles {
            self.seed_value(Collection::Roles, role).await;
            let entitlement = Entitlement {
                id: ObjectId::new(),
                kind: EntitlementKind::Role,
                user_id: user.id,
                data: EntitlementData {
                    reference: role.id,
                },
            };
            self.seed_value(Collection::Entitlements, &entitlement).await;
        }
    }

    /// Store a message together with its unread baseline read-state
    pub async fn seed_message<D: Serialize>(&self, message: &Message<D>) -> ObjectId {
        let id = self.seed_value(Collection::Messages, message).await;
        self.seed_value(Collection::MessagesRead, &MessageRead::baseline(id, message.kind))
            .await;
        id
    }
}
