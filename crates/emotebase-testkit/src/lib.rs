//! Emotebase Testing Infrastructure
//!
//! In-memory collaborators for exercising the mutation engine and query layer
//! without a database: a [`MemoryDocumentStore`] that evaluates aggregation
//! pipelines, a [`RecordingChangeSink`], and fixtures for users, emotes and
//! messages.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! emotebase-testkit = { path = "../emotebase-testkit" }
//! ```
//!
//! ```rust,no_run
//! use emotebase_testkit::*;
//!
//! # async fn example() {
//! let fixture = EngineFixture::new();
//! let owner = emote_editor("owner");
//! fixture.seed_user(&owner).await;
//! # }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod fixtures;
pub mod logging;
pub mod sink;
pub mod store;

pub use fixtures::*;
pub use logging::init_test_tracing;
pub use sink::RecordingChangeSink;
pub use store::{MemoryDocumentStore, StoreOp};
