//! Error Types
//!
//! Two kinds of failure exist in the runtime and they are kept strictly
//! apart:
//!
//! - [`NodeError`]: a failure raised by application code running inside a
//!   reactive computation. These are caught by the executor and routed to the
//!   nearest error boundary registered on the ancestor chain. They never
//!   unwind through the scheduler.
//!
//! - Structural errors (mismatched edge bookkeeping, executing a destroyed
//!   node): these are bugs in the runtime itself and are reported with
//!   `debug_assert!`, not with error values.
//!
//! Rejections at the admission boundary (rate limiting, unknown window ids)
//! are ordinary return values, not errors; see [`crate::session::CloseCode`].

use std::sync::Arc;

use thiserror::Error;

use crate::session::CloseCode;

/// A failure raised inside a reactive computation.
///
/// Cheap to clone so that every handler on an error boundary can observe the
/// same error.
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    /// A failure described by application code.
    #[error("{0}")]
    Message(String),

    /// A failure carried from another error type.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

impl NodeError {
    /// Build an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        NodeError::Message(message.into())
    }

    /// Wrap an existing error value.
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        NodeError::Other(Arc::new(err))
    }
}

impl From<String> for NodeError {
    fn from(message: String) -> Self {
        NodeError::Message(message)
    }
}

impl From<&str> for NodeError {
    fn from(message: &str) -> Self {
        NodeError::Message(message.to_owned())
    }
}

/// Failure to open or resume a session through the window manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The manager rejected the attempt; the close code says why.
    #[error("connection rejected with close code {0}")]
    Rejected(CloseCode),

    /// The manager task is no longer running.
    #[error("window manager terminated")]
    ManagerGone,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
