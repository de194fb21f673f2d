//! Reusable pipeline fragments
//!
//! Each fragment is a plain [`Pipeline`]; queries assemble them with
//! [`Pipeline::combine`].

use emotebase_core::{Collection, Expr, Filter, Pipeline, SortOrder, Stage, ID_FIELD};
use emotebase_structures::EntitlementKind;

/// Field holding the joined read-states of a message
pub const READ_STATES_FIELD: &str = "read_states";
/// Field holding grouped messages
pub const MESSAGES_FIELD: &str = "messages";
/// Field holding joined message authors
pub const AUTHORS_FIELD: &str = "authors";
/// Field holding joined role entitlements of the authors
pub const ROLE_ENTITLEMENTS_FIELD: &str = "role_entitlements";

/// Newest documents first, then `filter`, then an optional cap
///
/// The cap applies to the documents that pass `filter` and precedes any later
/// stage, so it bounds how many candidates are examined downstream.
pub fn newest_matching(filter: Filter, limit: Option<usize>) -> Pipeline {
    Pipeline::new()
        .stage(Stage::Sort {
            field: ID_FIELD.to_string(),
            order: SortOrder::Descending,
        })
        .stage(Stage::Match(filter))
        .stage_if(limit.map(Stage::Limit))
}

/// Keep messages that have been seen but not marked read
///
/// A message counts as unread when at least one read-state exists and none of
/// them is marked `read = true`. The joined read-states are dropped again.
pub fn unread_only() -> Pipeline {
    let marked_read = Filter::eq("read", true);
    Pipeline::new()
        .stage(Stage::Lookup {
            from: Collection::MessagesRead,
            local_field: ID_FIELD.to_string(),
            foreign_field: "message_id".to_string(),
            as_field: READ_STATES_FIELD.to_string(),
        })
        .stage(Stage::Set(vec![
            ("readers".to_string(), Expr::Size(READ_STATES_FIELD.to_string())),
            (
                "read".to_string(),
                Expr::FirstMatchField {
                    input: READ_STATES_FIELD.to_string(),
                    cond: marked_read,
                    field: "read".to_string(),
                },
            ),
        ]))
        .stage(Stage::Match(
            Filter::gt("readers", 0).and(Filter::ne("read", true)),
        ))
        .stage(Stage::Unset(vec![READ_STATES_FIELD.to_string()]))
}

/// Collapse every message into one document and join their authors
///
/// Authors' entitlements are narrowed to role entitlements.
pub fn grouped_with_authors() -> Pipeline {
    Pipeline::new()
        .stage(Stage::GroupAll {
            into: MESSAGES_FIELD.to_string(),
        })
        .stage(Stage::Lookup {
            from: Collection::Users,
            local_field: format!("{MESSAGES_FIELD}.author_id"),
            foreign_field: ID_FIELD.to_string(),
            as_field: AUTHORS_FIELD.to_string(),
        })
        .stage(Stage::Lookup {
            from: Collection::Entitlements,
            local_field: format!("{AUTHORS_FIELD}.{ID_FIELD}"),
            foreign_field: "user_id".to_string(),
            as_field: ROLE_ENTITLEMENTS_FIELD.to_string(),
        })
        .stage(Stage::Set(vec![(
            ROLE_ENTITLEMENTS_FIELD.to_string(),
            Expr::FilterArray {
                input: ROLE_ENTITLEMENTS_FIELD.to_string(),
                cond: Filter::eq("kind", EntitlementKind::Role.as_str()),
            },
        )]))
}
