//! Emotebase Structures - Entities, Builders and Change-Records
//!
//! Entities are plain serde structs matching their stored documents. Fields
//! marked relational are resolved by the query layer and never persisted.
//! Mutations go through the builders in [`builder`], which stage a
//! persistence directive and the matching change-record side by side.

#![forbid(unsafe_code)]

pub mod ban;
pub mod builder;
pub mod changes;
pub mod emote;
pub mod message;
pub mod permissions;
pub mod user;

pub use ban::{Ban, BanEffect};
pub use builder::{BanBuilder, ChangeSet, EmoteBuilder, MessageBuilder};
pub use changes::{ChangeField, ChangeMap, EventType, FieldValue};
pub use emote::{Emote, EmoteSet, EmoteStatus, EmoteVersion, EmoteVersioning};
pub use message::{Message, MessageDataModRequest, MessageKind, MessageRead};
pub use permissions::{RolePermission, UserEditorPermission};
pub use user::{Entitlement, EntitlementData, EntitlementKind, Role, User, UserEditor};
