//! Message read-state updates

use chrono::Utc;
use emotebase_authorization::allows;
use emotebase_core::{
    Collection, DocumentStore, EmoteError, Filter, ObjectId, ObjectKind, RequestContext, Result,
    UpdateDoc, UpdateResult,
};
use emotebase_structures::{FieldValue, RolePermission, User};
use tracing::instrument;

use crate::locks::EntityKey;
use crate::mutate::{storage_failure, Mutate};

/// Capabilities that make an actor a moderator of some message kind
const MODERATION_CAPABILITIES: [RolePermission; 3] = [
    RolePermission::EDIT_ANY_EMOTE,
    RolePermission::EDIT_ANY_EMOTE_SET,
    RolePermission::MANAGE_REPORTS,
];

impl<S: DocumentStore> Mutate<S> {
    /// Mark every read-state of the given messages as read or unread
    #[instrument(skip(self, ctx, actor, message_ids), fields(count = message_ids.len()))]
    pub async fn set_message_read_states(
        &self,
        ctx: &RequestContext,
        actor: Option<&User>,
        message_ids: &[ObjectId],
        read: bool,
    ) -> Result<UpdateResult> {
        let ctx = ctx.named("set_message_read_states");
        if actor.is_none() {
            return Err(EmoteError::unauthorized("marking messages requires a signed-in user"));
        }
        if !MODERATION_CAPABILITIES.iter().any(|cap| allows(actor, *cap)) {
            return Err(EmoteError::insufficient_privilege(
                "marking messages requires a moderation permission",
            ));
        }
        if message_ids.is_empty() {
            return Ok(UpdateResult::default());
        }

        let _guard = self
            .locks
            .acquire_within(
                &ctx,
                message_ids.iter().map(|id| EntityKey::new(ObjectKind::Message, *id)),
            )
            .await?;

        let update = UpdateDoc::new()
            .with_set("read", read)
            .with_set("timestamp", FieldValue::Timestamp(Utc::now()).to_value());
        let result = ctx
            .run(self.store.update_many(
                Collection::MessagesRead,
                &Filter::is_in("message_id", message_ids.iter().copied()),
                &update,
            ))
            .await?
            .map_err(|err| storage_failure("update read states", err))?;

        tracing::info!(matched = result.matched, "message read states updated");
        Ok(result)
    }
}
