//! Binding of related users onto query results

use std::collections::HashMap;

use emotebase_core::ObjectId;
use emotebase_structures::{Entitlement, EntitlementKind, Message, User};

/// Attaches related entities to decoded query results
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryBinder;

impl QueryBinder {
    /// Index users by id, attaching the roles granted by `entitlements`
    ///
    /// Only role entitlements addressed to one of the given users are used;
    /// everything else is ignored.
    pub fn map_users(
        &self,
        users: Vec<User>,
        entitlements: &[Entitlement],
    ) -> HashMap<ObjectId, User> {
        let mut map: HashMap<ObjectId, User> =
            users.into_iter().map(|user| (user.id, user)).collect();
        for entitlement in entitlements {
            if entitlement.kind != EntitlementKind::Role {
                continue;
            }
            let Some(user) = map.get_mut(&entitlement.user_id) else {
                continue;
            };
            if !user.role_ids.contains(&entitlement.data.reference) {
                user.role_ids.push(entitlement.data.reference);
            }
        }
        map
    }

    /// Set each message's author from `users`
    pub fn bind_authors<D>(&self, messages: &mut [Message<D>], users: &HashMap<ObjectId, User>) {
        for message in messages {
            message.author = users.get(&message.author_id).cloned();
        }
    }
}
