//! Unread moderation-request messages

use std::collections::BTreeMap;

use emotebase_authorization::allows;
use emotebase_core::{
    Collection, DocumentStore, EmoteError, Filter, ObjectId, ObjectKind, Pipeline, RequestContext,
    Result,
};
use emotebase_structures::{
    Entitlement, Message, MessageDataModRequest, MessageKind, RolePermission, User,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;

use crate::binder::QueryBinder;
use crate::pipelines::{grouped_with_authors, newest_matching, unread_only};
use crate::query::Query;

/// Capability gating each mod-request target kind
const TARGET_CAPABILITIES: [(ObjectKind, RolePermission); 3] = [
    (ObjectKind::Emote, RolePermission::EDIT_ANY_EMOTE),
    (ObjectKind::EmoteSet, RolePermission::EDIT_ANY_EMOTE_SET),
    (ObjectKind::Report, RolePermission::MANAGE_REPORTS),
];

/// Options for [`Query::mod_request_messages`]
#[derive(Debug, Clone, Default)]
pub struct ModRequestMessagesQueryOptions<'a> {
    /// Requesting user
    pub actor: Option<&'a User>,
    /// Target kinds to include; kinds mapped to `false` are excluded
    pub targets: BTreeMap<ObjectKind, bool>,
    /// Restrict to requests about these objects; empty means any
    pub target_ids: Vec<ObjectId>,
    /// Trust the caller and skip authentication and capability gating
    pub skip_permission_check: bool,
}

impl<'a> ModRequestMessagesQueryOptions<'a> {
    /// Options for `actor` covering the given target kinds
    pub fn new(actor: Option<&'a User>, kinds: impl IntoIterator<Item = ObjectKind>) -> Self {
        Self {
            actor,
            targets: kinds.into_iter().map(|kind| (kind, true)).collect(),
            ..Self::default()
        }
    }

    /// Restrict to requests about `ids`
    pub fn with_target_ids(mut self, ids: impl IntoIterator<Item = ObjectId>) -> Self {
        self.target_ids = ids.into_iter().collect();
        self
    }

    /// Target kinds the actor may see
    ///
    /// Fails with `Unauthorized` for an anonymous actor unless the permission
    /// check is skipped.
    pub fn eligible_kinds(&self) -> Result<Vec<ObjectKind>> {
        let mut targets = self.targets.clone();
        if !self.skip_permission_check {
            if self.actor.is_none() {
                return Err(EmoteError::unauthorized("sign-in is required"));
            }
            for (kind, capability) in TARGET_CAPABILITIES {
                if !allows(self.actor, capability) {
                    targets.insert(kind, false);
                }
            }
        }
        Ok(targets
            .into_iter()
            .filter_map(|(kind, wanted)| wanted.then_some(kind))
            .collect())
    }
}

/// The single document produced by the message pipeline
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "D: DeserializeOwned"))]
struct AggregatedMessages<D> {
    #[serde(default)]
    messages: Vec<Message<D>>,
    #[serde(default)]
    authors: Vec<User>,
    #[serde(default)]
    role_entitlements: Vec<Entitlement>,
}

impl<S: DocumentStore> Query<S> {
    /// Unread mod requests the actor may moderate, newest first
    ///
    /// `NoItems` means nothing is unread. The `message_query_limit` cap bounds
    /// the candidate requests examined before the unread filter, so fewer
    /// unread requests than the cap may come back even when more exist.
    #[instrument(
        skip(self, ctx, opts),
        fields(actor_id = ?opts.actor.map(|a| a.id), target_ids = opts.target_ids.len())
    )]
    pub async fn mod_request_messages(
        &self,
        ctx: &RequestContext,
        opts: ModRequestMessagesQueryOptions<'_>,
    ) -> Result<Vec<Message<MessageDataModRequest>>> {
        let kinds = opts.eligible_kinds()?;
        tracing::debug!(?kinds, "eligible mod request targets");

        let mut filter = Filter::eq("kind", MessageKind::ModRequest)
            .and(Filter::is_in("data.target_kind", kinds));
        if !opts.target_ids.is_empty() {
            filter = filter.and(Filter::is_in("data.target_id", opts.target_ids));
        }

        let limit = self.config.message_query_limit;
        self.messages(ctx, filter, Some(limit)).await
    }

    /// Unread messages matching `filter`, with authors bound
    pub async fn messages<D>(
        &self,
        ctx: &RequestContext,
        filter: Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Message<D>>>
    where
        D: DeserializeOwned + Send,
    {
        let ctx = ctx.named("messages");
        let pipeline = Pipeline::combine([
            newest_matching(filter, limit),
            unread_only(),
            grouped_with_authors(),
        ]);
        tracing::debug!(stages = pipeline.len(), "message pipeline built");

        let mut cursor = ctx
            .run(self.store.aggregate(Collection::Messages, &pipeline))
            .await?
            .map_err(|err| {
                tracing::error!(error = %err, "failed to run message aggregation");
                EmoteError::internal(err.to_string())
            })?;

        let result: AggregatedMessages<D> = match cursor.decode_next() {
            None => return Err(EmoteError::no_items("No messages")),
            Some(Ok(result)) => result,
            Some(Err(err)) => {
                tracing::error!(error = %err, "failed to decode aggregated messages");
                return Err(EmoteError::internal(err.to_string()));
            }
        };

        let binder = QueryBinder;
        let users = binder.map_users(result.authors, &result.role_entitlements);
        let mut messages = result.messages;
        binder.bind_authors(&mut messages, &users);
        Ok(messages)
    }
}
