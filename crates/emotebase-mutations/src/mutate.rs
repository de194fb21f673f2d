//! The mutation engine
//!
//! `Mutate` owns write access for the duration of each call: it checks
//! permissions, takes entity locks, applies builder directives to storage and
//! publishes the resulting change-record. No call retries internally.

use std::sync::Arc;

use emotebase_authorization::{allows_on_target, OwnerLookup, TargetRights};
use emotebase_core::document::from_document;
use emotebase_core::{
    Collection, DocumentStore, EmoteError, EngineConfig, Filter, ObjectId, RequestContext,
    Result, StoreError, ID_FIELD,
};
use emotebase_structures::{ChangeMap, Emote, EventType, RolePermission, User};

use crate::locks::LockTable;
use crate::sink::ChangeSink;

/// Permission-gated mutations over a document store
pub struct Mutate<S> {
    pub(crate) store: Arc<S>,
    pub(crate) locks: LockTable,
    pub(crate) sink: Arc<dyn ChangeSink>,
    pub(crate) config: EngineConfig,
}

impl<S> std::fmt::Debug for Mutate<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutate")
            .field("locks", &self.locks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> Mutate<S> {
    /// Engine over `store`, publishing to `sink`
    pub fn new(store: Arc<S>, sink: Arc<dyn ChangeSink>, config: EngineConfig) -> Self {
        Self {
            locks: LockTable::new(config.lock_shards),
            store,
            sink,
            config,
        }
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Entity lock table
    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Require the actor's rights over an emote, resolving its owner if needed
    pub(crate) async fn check_emote_rights(
        &self,
        ctx: &RequestContext,
        actor: Option<&User>,
        emote: &Emote,
    ) -> Result<()> {
        let fetched;
        let owner = match (emote.owner_id, emote.owner.as_ref()) {
            (None, _) => OwnerLookup::Unowned,
            (Some(_), Some(owner)) => OwnerLookup::Loaded(owner),
            // The owner rule decides before the lookup would be consulted.
            (Some(owner_id), None) if actor.is_some_and(|a| a.id == owner_id) => {
                OwnerLookup::NotFound
            }
            (Some(owner_id), None) => {
                fetched = self.find_user(ctx, owner_id).await?;
                match &fetched {
                    Some(user) => OwnerLookup::Loaded(user),
                    None => OwnerLookup::NotFound,
                }
            }
        };

        let target = TargetRights::emote(emote.owner_id, owner);
        allows_on_target(actor, RolePermission::EDIT_EMOTE, &target)
            .into_result()
            .map_err(|err| {
                tracing::warn!(emote_id = %emote.id, error = %err, "emote rights denied");
                err
            })
    }

    /// Load a user by id; `None` when it does not exist
    pub(crate) async fn find_user(
        &self,
        ctx: &RequestContext,
        id: ObjectId,
    ) -> Result<Option<User>> {
        let found = ctx
            .run(self.store.find_one(Collection::Users, &Filter::eq(ID_FIELD, id)))
            .await?;
        match found {
            Ok(doc) => from_document(doc)
                .map(Some)
                .map_err(|err| storage_failure("decode user", err)),
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(storage_failure("fetch user", err)),
        }
    }

    /// Load an emote by id; `None` when it does not exist
    pub(crate) async fn find_emote(
        &self,
        ctx: &RequestContext,
        id: ObjectId,
    ) -> Result<Option<Emote>> {
        let found = ctx
            .run(self.store.find_one(Collection::Emotes, &Filter::eq(ID_FIELD, id)))
            .await?;
        match found {
            Ok(doc) => from_document(doc)
                .map(Some)
                .map_err(|err| storage_failure("decode emote", err)),
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(storage_failure("fetch emote", err)),
        }
    }

    /// Hand a change-record to the sink; a failed publish is only logged
    ///
    /// Records that change no field and carry no object are dropped.
    pub(crate) async fn publish(&self, event: EventType, change: ChangeMap) {
        let id = change.id;
        if change.is_empty() && change.object.is_none() {
            tracing::debug!(event = %event, target_id = %id, "empty change-record skipped");
            return;
        }
        if let Err(err) = self.sink.publish(event, change).await {
            tracing::warn!(event = %event, target_id = %id, error = %err, "change publish failed");
        }
    }
}

/// Log a storage failure and surface it as an opaque internal error
pub(crate) fn storage_failure(operation: &str, err: StoreError) -> EmoteError {
    tracing::error!(operation, error = %err, "storage failure");
    EmoteError::internal(format!("{operation}: {err}"))
}
