//! Document store effect trait
//!
//! The engine never talks to a database driver directly. It consumes this
//! trait, which is atomic at single-document granularity only: multi-document
//! operations (`update_many`, sequences of calls) give no cross-document
//! guarantees.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;

use crate::document::{from_document, Document};
use crate::filter::Filter;
use crate::identifiers::{Collection, ObjectId};
use crate::pipeline::Pipeline;
use crate::update::UpdateDoc;

/// Errors raised by a document store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No document matched the filter
    #[error("no documents in result")]
    NotFound,

    /// The backend failed to execute the operation
    #[error("store backend error: {message}")]
    Backend {
        /// Backend detail
        message: String,
    },

    /// A document could not be encoded or decoded
    #[error("document decode error: {message}")]
    Decode {
        /// Decoder detail
        message: String,
    },
}

impl StoreError {
    /// Create a backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Whether this is the not-found outcome rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Which version of a document `find_one_and_update` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnDocument {
    /// The document as it was before the update
    Before,
    /// The document after the update was applied
    #[default]
    After,
}

/// Counts reported by update operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    /// Documents matched by the filter
    pub matched: u64,
    /// Documents actually changed
    pub modified: u64,
}

/// Results of an aggregation, consumed front to back
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    docs: VecDeque<Document>,
}

impl Cursor {
    /// Wrap materialized results
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs: docs.into() }
    }

    /// Take the next raw document
    pub fn next_document(&mut self) -> Option<Document> {
        self.docs.pop_front()
    }

    /// Take and decode the next document; `None` once exhausted
    pub fn decode_next<T: DeserializeOwned>(&mut self) -> Option<Result<T, StoreError>> {
        self.next_document().map(from_document)
    }

    /// Documents not yet consumed
    pub fn remaining(&self) -> usize {
        self.docs.len()
    }
}

/// Storage collaborator consumed by the mutation engine and query layer
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First document matching `filter`, or `StoreError::NotFound`
    async fn find_one(&self, collection: Collection, filter: &Filter)
        -> Result<Document, StoreError>;

    /// Atomically patch the first match and return it
    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &UpdateDoc,
        returning: ReturnDocument,
    ) -> Result<Document, StoreError>;

    /// Patch the first match
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &UpdateDoc,
    ) -> Result<UpdateResult, StoreError>;

    /// Patch every match
    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &UpdateDoc,
    ) -> Result<UpdateResult, StoreError>;

    /// Insert a document, generating `_id` when it is absent or nil
    async fn insert_one(&self, collection: Collection, doc: Document)
        -> Result<ObjectId, StoreError>;

    /// Run an aggregation pipeline against a collection
    async fn aggregate(
        &self,
        collection: Collection,
        pipeline: &Pipeline,
    ) -> Result<Cursor, StoreError>;
}
