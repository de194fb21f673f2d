//! Emotebase Core - Foundation Types and Storage Effects
//!
//! Shared vocabulary for the emotebase crates. Nothing here performs I/O; the
//! engine reaches storage through the [`effects::DocumentStore`] trait.
//!
//! # Layout
//!
//! - `identifiers`: `ObjectId`, `ObjectKind`, `Collection`
//! - `document`, `filter`, `update`, `pipeline`: the document model, predicates,
//!   patches and aggregation stages as plain data
//! - `effects`: `DocumentStore` and `CancellationToken`
//! - `context`: request context with cancellation-aware storage calls
//! - `config`: engine tunables loaded from TOML and `EMOTEBASE_*` variables
//! - `errors`: the unified `EmoteError`

#![forbid(unsafe_code)]

/// Engine configuration
pub mod config;

/// Request context and cancellation
pub mod context;

/// Stored document model and dot-path helpers
pub mod document;

/// Effect traits for storage and cancellation
pub mod effects;

/// Unified error handling
pub mod errors;

/// Document predicates
pub mod filter;

/// Object identifiers and kinds
pub mod identifiers;

/// Aggregation pipeline descriptors
pub mod pipeline;

/// Field-level persistence directives
pub mod update;

pub use config::{EngineConfig, EngineSettings};
pub use context::RequestContext;
pub use document::{Document, ID_FIELD};
pub use effects::{Cursor, DocumentStore, ReturnDocument, StoreError, UpdateResult};
pub use errors::{EmoteError, Result};
pub use filter::Filter;
pub use identifiers::{Collection, ObjectId, ObjectKind};
pub use pipeline::{Expr, Pipeline, SortOrder, Stage};
pub use update::UpdateDoc;
