//! Effect traits consumed by the engine
//!
//! - [`DocumentStore`]: persistence and aggregation
//! - [`CancellationToken`]: request-scoped cancellation

pub mod store;
pub mod task;

pub use store::{Cursor, DocumentStore, ReturnDocument, StoreError, UpdateResult};
pub use task::{CancelHandle, CancellationToken, NeverCancel};
