//! Request context
//!
//! Every engine operation runs under a `RequestContext`. Storage calls are
//! raced against the context's cancellation token; once a call has completed
//! its write stands, and cancellation only prevents the calls that follow.

use std::future::Future;
use std::sync::Arc;

use crate::effects::{CancellationToken, NeverCancel};
use crate::errors::{EmoteError, Result};

/// Ambient per-request state
#[derive(Clone)]
pub struct RequestContext {
    cancel: Arc<dyn CancellationToken>,
    operation: &'static str,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("operation", &self.operation)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}

impl RequestContext {
    /// Context that is never cancelled
    pub fn background() -> Self {
        Self {
            cancel: Arc::new(NeverCancel),
            operation: "background",
        }
    }

    /// Context bound to a cancellation token
    pub fn with_cancellation(cancel: Arc<dyn CancellationToken>) -> Self {
        Self {
            cancel,
            operation: "request",
        }
    }

    /// Same context, labelled with the operation being run
    pub fn named(&self, operation: &'static str) -> Self {
        Self {
            cancel: Arc::clone(&self.cancel),
            operation,
        }
    }

    /// Label of the current operation
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast when the context is already cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(EmoteError::cancelled(self.operation));
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled first
    pub async fn run<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(EmoteError::cancelled(self.operation)),
            out = fut => Ok(out),
        }
    }
}
