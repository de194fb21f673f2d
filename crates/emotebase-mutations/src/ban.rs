//! Ban creation and edits

use emotebase_authorization::require;
use emotebase_core::document::to_document;
use emotebase_core::{
    Collection, DocumentStore, EmoteError, Filter, ObjectKind, RequestContext, Result,
    ReturnDocument, StoreError, ID_FIELD,
};
use emotebase_structures::{BanBuilder, EventType, RolePermission, User};
use tracing::instrument;

use crate::locks::EntityKey;
use crate::mutate::{storage_failure, Mutate};

impl<S: DocumentStore> Mutate<S> {
    /// Insert the builder's ban on behalf of `actor`
    #[instrument(skip(self, ctx, actor, builder), fields(victim_id = %builder.ban().victim_id))]
    pub async fn create_ban(
        &self,
        ctx: &RequestContext,
        actor: Option<&User>,
        builder: &mut BanBuilder,
    ) -> Result<()> {
        let ctx = ctx.named("create_ban");
        builder.changes().ensure_untainted()?;
        require(actor, RolePermission::MANAGE_BANS, "MANAGE_BANS").into_result()?;
        let Some(actor) = actor else {
            return Err(EmoteError::unauthorized("banning requires a signed-in user"));
        };

        let victim_id = builder.ban().victim_id;
        if victim_id.is_nil() {
            return Err(EmoteError::incomplete_mutation("ban has no victim"));
        }
        if victim_id == actor.id {
            return Err(EmoteError::invalid_request("You cannot ban yourself"));
        }

        let _guard = self
            .locks
            .acquire_within(&ctx, [EntityKey::new(ObjectKind::User, victim_id)])
            .await?;
        if self.find_user(&ctx, victim_id).await?.is_none() {
            return Err(EmoteError::invalid_request("Victim user doesn't exist"));
        }

        builder.set_actor_id(actor.id);
        let doc = to_document(builder.ban()).map_err(|err| storage_failure("encode ban", err))?;
        let ban_id = ctx
            .run(self.store.insert_one(Collection::Bans, doc))
            .await?
            .map_err(|err| storage_failure("insert ban", err))?;
        builder.assign_id(ban_id);
        builder.mark_tainted();

        tracing::info!(ban_id = %ban_id, effects = ?builder.ban().effects.names(), "ban created");
        let object = to_document(builder.ban()).ok().map(serde_json::Value::Object);
        self.publish(EventType::CreateBan, builder.changes().change_map(object))
            .await;
        Ok(())
    }

    /// Apply the builder's staged fields to an existing ban
    #[instrument(skip(self, ctx, actor, builder), fields(ban_id = %builder.ban().id))]
    pub async fn edit_ban(
        &self,
        ctx: &RequestContext,
        actor: Option<&User>,
        builder: &mut BanBuilder,
    ) -> Result<()> {
        let ctx = ctx.named("edit_ban");
        builder.changes().ensure_untainted()?;
        require(actor, RolePermission::MANAGE_BANS, "MANAGE_BANS").into_result()?;

        let ban_id = builder.ban().id;
        if ban_id.is_nil() {
            return Err(EmoteError::incomplete_mutation("ban has no id"));
        }
        if builder.changes().is_empty() {
            return Ok(());
        }

        let _guard = self
            .locks
            .acquire_within(&ctx, [EntityKey::new(ObjectKind::Ban, ban_id)])
            .await?;
        ctx.run(self.store.find_one_and_update(
            Collection::Bans,
            &Filter::eq(ID_FIELD, ban_id),
            builder.changes().update(),
            ReturnDocument::After,
        ))
        .await?
        .map_err(|err| match err {
            StoreError::NotFound => EmoteError::invalid_request("Ban doesn't exist"),
            err => storage_failure("update ban", err),
        })?;
        builder.mark_tainted();

        tracing::info!("ban updated");
        self.publish(EventType::UpdateBan, builder.changes().change_map(None))
            .await;
        Ok(())
    }
}
