//! Change sinks that keep what they receive

use async_lock::Mutex;
use async_trait::async_trait;
use emotebase_core::{EmoteError, Result};
use emotebase_mutations::ChangeSink;
use emotebase_structures::{ChangeMap, EventType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sink recording every published change-record in order
#[derive(Debug, Clone, Default)]
pub struct RecordingChangeSink {
    records: Arc<Mutex<Vec<(EventType, ChangeMap)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingChangeSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent publish
    pub fn fail_publishes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Records received so far
    pub async fn records(&self) -> Vec<(EventType, ChangeMap)> {
        self.records.lock().await.clone()
    }

    /// Records received under `event`
    pub async fn records_for(&self, event: EventType) -> Vec<ChangeMap> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|(received, _)| event.matches(*received))
            .map(|(_, change)| change.clone())
            .collect()
    }
}

#[async_trait]
impl ChangeSink for RecordingChangeSink {
    async fn publish(&self, event: EventType, change: ChangeMap) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmoteError::internal("sink unavailable"));
        }
        self.records.lock().await.push((event, change));
        Ok(())
    }
}
