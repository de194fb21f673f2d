//! Emotebase Mutations - Mutation Engine and Version Graph
//!
//! Entry points live on [`Mutate`]:
//!
//! - `to_version` / `set_current_version`: emote version graph
//! - `send_mod_request_message`: moderation-request dispatch
//! - `set_message_read_states`: mark moderation messages handled
//! - `create_ban` / `edit_ban`: ban mutations
//!
//! Every entry point checks permissions before its first write and holds the
//! [`LockTable`] entries of the entities it touches until it returns.

#![forbid(unsafe_code)]

mod ban;
pub mod emote_version;
pub mod locks;
pub mod mod_request;
mod mutate;
mod read_state;
pub mod sink;

pub use emote_version::{CreateVersionOptions, EmoteMutation};
pub use locks::{EntityGuard, EntityKey, LockTable, MultiGuard};
pub use mod_request::target_filter;
pub use mutate::Mutate;
pub use sink::{ChangeSink, DiscardChanges};
