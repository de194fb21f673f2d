//! Emote version graph
//!
//! Each lineage has exactly one current version: an emote with neither
//! `parent_id` nor a versioning record. [`Mutate::to_version`] attaches an emote
//! under a parent. Unless the new version diverges it then becomes the current
//! version through promotion:
//!
//! 1. live emotes pointing at the old current are re-pointed at the new one
//! 2. the new current loses its lineage fields
//! 3. the old current is demoted to a version under the new current
//!
//! Promotion is idempotent. The steps are separate single-document writes; a
//! failure between them leaves a lineage that re-running promotion repairs.
//!
//! Writers hold the locks of the emote, its parent and the lineage root. The
//! root is re-read under those locks, so two concurrent updates of one lineage
//! promote one after the other.

use std::collections::BTreeSet;

use chrono::Utc;
use emotebase_authorization::require;
use emotebase_core::document::from_document;
use emotebase_core::{
    Collection, DocumentStore, EmoteError, Filter, ObjectId, RequestContext, Result,
    ReturnDocument, StoreError, UpdateDoc, ID_FIELD,
};
use emotebase_structures::{
    ChangeMap, Emote, EmoteBuilder, EmoteStatus, EmoteVersioning, EventType, RolePermission, User,
};
use tracing::instrument;

use crate::locks::{EntityKey, MultiGuard};
use crate::mutate::{storage_failure, Mutate};

/// An emote builder together with the acting user
#[derive(Debug, Clone)]
pub struct EmoteMutation {
    /// Target emote and its staged changes
    pub builder: EmoteBuilder,
    /// Acting user; `None` for anonymous callers
    pub actor: Option<User>,
}

impl EmoteMutation {
    /// Mutation of `emote` by `actor`
    pub fn new(emote: Emote, actor: Option<User>) -> Self {
        Self {
            builder: EmoteBuilder::new(emote),
            actor,
        }
    }
}

/// Options for [`Mutate::to_version`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateVersionOptions {
    /// Version label
    pub tag: String,
    /// Fork the lineage instead of updating it
    pub diverges: bool,
}

impl<S: DocumentStore> Mutate<S> {
    /// Make the mutation's emote a version of `parent`
    ///
    /// Permission and lineage checks run before anything is written. If the
    /// versioning write succeeds but promotion fails, the emote stays versioned
    /// and the caller may retry with [`Mutate::set_current_version`].
    #[instrument(
        skip(self, ctx, mutation, parent, opts),
        fields(
            emote_id = %mutation.builder.emote().id,
            parent_id = %parent.id,
            diverges = opts.diverges
        )
    )]
    pub async fn to_version(
        &self,
        ctx: &RequestContext,
        mutation: &mut EmoteMutation,
        parent: &Emote,
        opts: CreateVersionOptions,
    ) -> Result<()> {
        let ctx = ctx.named("to_version");
        mutation.builder.changes().ensure_untainted()?;
        let target = mutation.builder.emote().clone();
        if target.id.is_nil() {
            return Err(EmoteError::incomplete_mutation("emote builder has no target"));
        }
        let actor = mutation.actor.as_ref();

        require(actor, RolePermission::EDIT_EMOTE, "EDIT_EMOTE").into_result()?;
        self.check_emote_rights(&ctx, actor, &target).await?;
        self.check_emote_rights(&ctx, actor, parent).await?;
        if target.id == parent.id {
            return Err(EmoteError::invalid_request("an emote cannot be a version of itself"));
        }

        let (_guard, root) = self.lock_lineage(&ctx, actor, target.id, parent, &opts).await?;

        mutation
            .builder
            .set_parent_id(Some(parent.id))
            .set_versioning(Some(EmoteVersioning {
                tag: opts.tag.clone(),
                diverged: opts.diverges,
                timestamp: Utc::now(),
            }));

        let stored = ctx
            .run(self.store.find_one_and_update(
                Collection::Emotes,
                &Filter::eq(ID_FIELD, target.id),
                mutation.builder.changes().update(),
                ReturnDocument::After,
            ))
            .await?
            .map_err(|err| match err {
                StoreError::NotFound => {
                    EmoteError::incomplete_mutation(format!("emote {} does not exist", target.id))
                }
                err => storage_failure("persist emote version", err),
            })?;
        let stored: Emote =
            from_document(stored).map_err(|err| storage_failure("decode emote", err))?;
        mutation.builder.refresh(stored);
        mutation.builder.mark_tainted();

        let mut demoted = None;
        if !opts.diverges {
            self.promote(&ctx, target.id, root.id).await?;
            mutation.builder.set_parent_id(None).set_versioning(None);
            demoted = Some(demotion_record(root.clone(), target.id));
        }

        tracing::info!(root_id = %root.id, "emote version recorded");
        self.publish(EventType::UpdateEmote, mutation.builder.changes().change_map(None))
            .await;
        if let Some(record) = demoted {
            self.publish(EventType::UpdateEmote, record).await;
        }
        Ok(())
    }

    /// Make the mutation's emote the current version in place of `previous`
    #[instrument(
        skip(self, ctx, mutation, previous),
        fields(emote_id = %mutation.builder.emote().id, previous_id = %previous.id)
    )]
    pub async fn set_current_version(
        &self,
        ctx: &RequestContext,
        mutation: &mut EmoteMutation,
        previous: &Emote,
    ) -> Result<()> {
        let ctx = ctx.named("set_current_version");
        let target = mutation.builder.emote().clone();
        if target.id.is_nil() {
            return Err(EmoteError::incomplete_mutation("emote builder has no target"));
        }
        let actor = mutation.actor.as_ref();

        require(actor, RolePermission::EDIT_EMOTE, "EDIT_EMOTE").into_result()?;
        self.check_emote_rights(&ctx, actor, &target).await?;
        self.check_emote_rights(&ctx, actor, previous).await?;

        let _guard = self
            .locks
            .acquire_within(&ctx, [EntityKey::emote(target.id), EntityKey::emote(previous.id)])
            .await?;
        let before = self.require_emote(&ctx, target.id).await?;
        let previous = self.require_emote(&ctx, previous.id).await?;
        self.promote(&ctx, target.id, previous.id).await?;

        let mut promoted = EmoteBuilder::new(before);
        promoted.set_parent_id(None).set_versioning(None);
        let record = promoted.changes().change_map(None);
        mutation.builder.refresh(promoted.into_emote());

        tracing::info!("current version replaced");
        self.publish(EventType::UpdateEmote, record).await;
        self.publish(EventType::UpdateEmote, demotion_record(previous, target.id))
            .await;
        Ok(())
    }

    /// Lock `target`, `parent` and the lineage root, returning the root as stored
    ///
    /// The root is first resolved from the caller's copy of `parent`, then again
    /// from storage once the locks are held. A root that moved in between means
    /// another promotion won the race; the locks are released and taken again
    /// around the new root.
    async fn lock_lineage(
        &self,
        ctx: &RequestContext,
        actor: Option<&User>,
        target: ObjectId,
        parent: &Emote,
        opts: &CreateVersionOptions,
    ) -> Result<(MultiGuard, Emote)> {
        let mut root = self.resolve_lineage_root(ctx, target, parent).await?;

        for _ in 0..=self.config.max_lineage_depth {
            if !opts.diverges && root.id != parent.id {
                self.check_emote_rights(ctx, actor, &root).await?;
            }
            let guard = self
                .locks
                .acquire_within(
                    ctx,
                    [
                        EntityKey::emote(target),
                        EntityKey::emote(parent.id),
                        EntityKey::emote(root.id),
                    ],
                )
                .await?;

            let stored_parent = self.find_emote(ctx, parent.id).await?.ok_or_else(|| {
                EmoteError::invalid_request(format!("parent emote {} does not exist", parent.id))
            })?;
            let locked_root = self.resolve_lineage_root(ctx, target, &stored_parent).await?;
            if locked_root.id == root.id {
                return Ok((guard, locked_root));
            }

            drop(guard);
            tracing::debug!(
                expected = %root.id,
                found = %locked_root.id,
                "lineage root moved while locking"
            );
            root = locked_root;
        }

        Err(EmoteError::invalid_request(format!(
            "lineage of {} kept changing while being locked",
            parent.id
        )))
    }

    /// Re-point the lineage of `previous` at `current`
    pub(crate) async fn promote(
        &self,
        ctx: &RequestContext,
        current: ObjectId,
        previous: ObjectId,
    ) -> Result<()> {
        if current == previous {
            return Err(EmoteError::invalid_request("an emote cannot replace itself"));
        }

        let children = Filter::eq("parent_id", previous)
            .and(Filter::ne(ID_FIELD, current))
            .and(Filter::ne(ID_FIELD, previous))
            .and(Filter::eq("status", EmoteStatus::Live));
        let moved = ctx
            .run(self.store.update_many(
                Collection::Emotes,
                &children,
                &UpdateDoc::new().with_set("parent_id", current),
            ))
            .await?
            .map_err(|err| storage_failure("re-parent versions", err))?;

        ctx.run(self.store.update_one(
            Collection::Emotes,
            &Filter::eq(ID_FIELD, current),
            &UpdateDoc::new().with_unset("parent_id").with_unset("versioning"),
        ))
        .await?
        .map_err(|err| storage_failure("clear current version", err))?;

        ctx.run(self.store.update_one(
            Collection::Emotes,
            &Filter::eq(ID_FIELD, previous),
            &UpdateDoc::new().with_set("parent_id", current).with_unset("versioning"),
        ))
        .await?
        .map_err(|err| storage_failure("demote previous version", err))?;

        tracing::info!(
            current_id = %current,
            previous_id = %previous,
            moved = moved.modified,
            "current version promoted"
        );
        Ok(())
    }

    /// Follow `parent_id` links from `parent` to the lineage's current version
    pub(crate) async fn resolve_lineage_root(
        &self,
        ctx: &RequestContext,
        target: ObjectId,
        parent: &Emote,
    ) -> Result<Emote> {
        let mut seen = BTreeSet::from([parent.id]);
        let mut node = parent.clone();

        for _ in 0..self.config.max_lineage_depth {
            let Some(next) = node.parent_id else {
                return Ok(node);
            };
            if next == target || !seen.insert(next) {
                return Err(EmoteError::invalid_request(format!(
                    "lineage of {} forms a cycle through {next}",
                    parent.id
                )));
            }
            node = self.find_emote(ctx, next).await?.ok_or_else(|| {
                EmoteError::invalid_request(format!(
                    "lineage of {} references missing emote {next}",
                    parent.id
                ))
            })?;
        }

        Err(EmoteError::invalid_request(format!(
            "lineage of {} exceeds {} links",
            parent.id, self.config.max_lineage_depth
        )))
    }

    async fn require_emote(&self, ctx: &RequestContext, id: ObjectId) -> Result<Emote> {
        self.find_emote(ctx, id)
            .await?
            .ok_or_else(|| EmoteError::invalid_request(format!("emote {id} does not exist")))
    }
}

/// Change-record for `emote` demoted to a version under `current`
fn demotion_record(emote: Emote, current: ObjectId) -> ChangeMap {
    let mut builder = EmoteBuilder::new(emote);
    builder.set_parent_id(Some(current)).set_versioning(None);
    builder.changes().change_map(None)
}
