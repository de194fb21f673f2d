//! The query layer

use std::sync::Arc;

use emotebase_core::{DocumentStore, EngineConfig};

/// Read-only aggregation queries over a document store
///
/// Queries take no entity locks. A result may race with an in-flight
/// promotion and observe either side of it.
pub struct Query<S> {
    pub(crate) store: Arc<S>,
    pub(crate) config: EngineConfig,
}

impl<S> std::fmt::Debug for Query<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: DocumentStore> Query<S> {
    /// Query layer over `store`
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
