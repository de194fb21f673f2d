//! Unified error system for emotebase
//!
//! One error type is shared by the mutation engine and the query layer so that
//! callers can branch on the kind of failure without knowing which layer
//! produced it. Permission and validation kinds are surfaced to the caller as-is;
//! storage and decoding failures collapse into `InternalServerError`.

use serde::{Deserialize, Serialize};

use crate::effects::StoreError;

/// Unified error type for all emotebase operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum EmoteError {
    /// A builder or its target entity was missing
    #[error("Incomplete mutation: {message}")]
    IncompleteMutation {
        /// Which part of the mutation was missing
        message: String,
    },

    /// The actor lacks a capability required by the operation
    #[error("Insufficient privilege: {message}")]
    InsufficientPrivilege {
        /// Which capability check failed
        message: String,
    },

    /// A builder was reused after it had been applied
    #[error("Tainted object: {message}")]
    TaintedObject {
        /// Which builder was reused
        message: String,
    },

    /// The request referenced something that does not exist or is malformed
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the request
        message: String,
    },

    /// Storage or decoding failure
    #[error("Internal server error: {message}")]
    InternalServerError {
        /// Detail for logs; never meaningful to end users
        message: String,
    },

    /// A query completed but matched nothing
    #[error("No items: {message}")]
    NoItems {
        /// What was being looked for
        message: String,
    },

    /// An authenticated actor was required
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Which operation required authentication
        message: String,
    },

    /// The request context was cancelled while a storage call was in flight
    #[error("Cancelled: {message}")]
    Cancelled {
        /// Which operation was interrupted
        message: String,
    },
}

impl EmoteError {
    /// Create an incomplete mutation error
    pub fn incomplete_mutation(message: impl Into<String>) -> Self {
        Self::IncompleteMutation {
            message: message.into(),
        }
    }

    /// Create an insufficient privilege error
    pub fn insufficient_privilege(message: impl Into<String>) -> Self {
        Self::InsufficientPrivilege {
            message: message.into(),
        }
    }

    /// Create a tainted object error
    pub fn tainted_object(message: impl Into<String>) -> Self {
        Self::TaintedObject {
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalServerError {
            message: message.into(),
        }
    }

    /// Create a no items error
    pub fn no_items(message: impl Into<String>) -> Self {
        Self::NoItems {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Detail attached to this error
    pub fn detail(&self) -> &str {
        match self {
            Self::IncompleteMutation { message }
            | Self::InsufficientPrivilege { message }
            | Self::TaintedObject { message }
            | Self::InvalidRequest { message }
            | Self::InternalServerError { message }
            | Self::NoItems { message }
            | Self::Unauthorized { message }
            | Self::Cancelled { message } => message,
        }
    }

    /// True when the error is a permission or validation failure raised before any write
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InsufficientPrivilege { .. }
                | Self::InvalidRequest { .. }
                | Self::Unauthorized { .. }
                | Self::IncompleteMutation { .. }
                | Self::TaintedObject { .. }
        )
    }
}

/// Standard Result type for emotebase operations
pub type Result<T> = std::result::Result<T, EmoteError>;

impl From<StoreError> for EmoteError {
    fn from(err: StoreError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<serde_json::Error> for EmoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("decode: {err}"))
    }
}
