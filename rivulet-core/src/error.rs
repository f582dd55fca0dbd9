//! Error types for the reactive runtime.
//!
//! The engine itself has a single failure mode of its own: writing to a
//! derived node. Everything else a caller can observe (a panicking user
//! computation, for instance) propagates through the call stack unchanged.

use thiserror::Error;

use crate::graph::NodeKind;

/// Result alias used throughout the crate.
pub type Result<T, E = SignalError> = std::result::Result<T, E>;

/// Errors surfaced by signal handles.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Attempted to assign a value to a read-only node.
    #[error("invalid mutation: cannot assign to a {kind} node")]
    InvalidMutation {
        /// The kind of node the write was aimed at.
        kind: NodeKind,
    },

    /// The current value could not be turned into JSON.
    #[error("failed to serialize signal value: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SignalError {
    /// Whether this error is an attempted write to a read-only node.
    pub fn is_invalid_mutation(&self) -> bool {
        matches!(self, SignalError::InvalidMutation { .. })
    }
}
