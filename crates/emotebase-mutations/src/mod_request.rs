//! Moderation-request dispatch

use emotebase_core::document::to_document;
use emotebase_core::{
    Collection, DocumentStore, EmoteError, Filter, ObjectKind, RequestContext, Result,
    StoreError, ID_FIELD,
};
use emotebase_structures::{EventType, MessageBuilder, MessageDataModRequest, MessageRead};
use tracing::instrument;

use crate::locks::EntityKey;
use crate::mutate::{storage_failure, Mutate};

/// Filter matching the object a mod request points at
///
/// Emote targets may name a version id embedded in another emote, so both
/// the document id and the embedded version ids are searched.
pub fn target_filter(request: &MessageDataModRequest) -> Filter {
    match request.target_kind {
        ObjectKind::Emote => Filter::Or(vec![
            Filter::eq(ID_FIELD, request.target_id),
            Filter::eq("versions.id", request.target_id),
        ]),
        _ => Filter::eq(ID_FIELD, request.target_id),
    }
}

impl<S: DocumentStore> Mutate<S> {
    /// Send a moderation request after verifying its target exists
    ///
    /// The builder is tainted once the message has been inserted, even if
    /// writing its baseline read-state fails; that failure is still returned.
    #[instrument(
        skip(self, ctx, builder),
        fields(
            target_kind = %builder.message().data.target_kind,
            target_id = %builder.message().data.target_id,
        )
    )]
    pub async fn send_mod_request_message(
        &self,
        ctx: &RequestContext,
        builder: &mut MessageBuilder<MessageDataModRequest>,
    ) -> Result<()> {
        let ctx = ctx.named("send_mod_request_message");
        builder.changes().ensure_untainted()?;
        if builder.message().author_id.is_nil() {
            return Err(EmoteError::incomplete_mutation("mod request has no author"));
        }

        let request = builder.message().data.clone();
        let _guard = self
            .locks
            .acquire_within(&ctx, [EntityKey::new(request.target_kind, request.target_id)])
            .await?;

        let found = ctx
            .run(self.store.find_one(request.target_kind.collection(), &target_filter(&request)))
            .await?;
        match found {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                return Err(EmoteError::invalid_request("Target item doesn't exist"));
            }
            Err(err) => return Err(storage_failure("look up mod request target", err)),
        }

        let doc = to_document(builder.message())
            .map_err(|err| storage_failure("encode message", err))?;
        let message_id = ctx
            .run(self.store.insert_one(Collection::Messages, doc))
            .await?
            .map_err(|err| storage_failure("insert message", err))?;
        builder.assign_id(message_id);

        let kind = builder.message().kind;
        let inserted = async {
            let doc = to_document(&MessageRead::baseline(message_id, kind))
                .map_err(|err| storage_failure("encode read state", err))?;
            ctx.run(self.store.insert_one(Collection::MessagesRead, doc))
                .await?
                .map_err(|err| storage_failure("insert read state", err))?;
            Ok::<_, EmoteError>(())
        }
        .await;
        builder.mark_tainted();
        inserted?;

        tracing::info!(message_id = %message_id, "mod request sent");
        let object = to_document(builder.message()).ok().map(serde_json::Value::Object);
        self.publish(EventType::CreateMessage, builder.changes().change_map(object))
            .await;
        Ok(())
    }
}
