//! Emotebase Query - Read-State-Aware Aggregations
//!
//! Read queries built as aggregation pipelines and run in one store call. Raw
//! results are decoded into entities and enriched with their related users by
//! [`QueryBinder`].

#![forbid(unsafe_code)]

pub mod binder;
pub mod messages;
pub mod pipelines;
mod query;

pub use binder::QueryBinder;
pub use messages::ModRequestMessagesQueryOptions;
pub use query::Query;
