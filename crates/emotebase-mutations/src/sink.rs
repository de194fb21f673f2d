//! Change-record consumer

use async_trait::async_trait;
use emotebase_core::Result;
use emotebase_structures::{ChangeMap, EventType};

/// Receives one change-record per successful mutation
///
/// Delivery guarantees belong to the implementation. The engine logs a failed
/// publish and does not undo the mutation.
#[async_trait]
pub trait ChangeSink: Send + Sync {
    /// Publish a change-record under an event type
    async fn publish(&self, event: EventType, change: ChangeMap) -> Result<()>;
}

/// Sink that drops every record
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardChanges;

#[async_trait]
impl ChangeSink for DiscardChanges {
    async fn publish(&self, _event: EventType, _change: ChangeMap) -> Result<()> {
        Ok(())
    }
}
