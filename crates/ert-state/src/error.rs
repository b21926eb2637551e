//! Error types for state map operations.

use std::path::PathBuf;

use crate::RealizationState;

pub type StateResult<T> = Result<T, StateError>;

#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error("Realization index out of range: index={index}, len={len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Illegal state transition for realization {index}: {from} -> {to}")]
    IllegalTransition {
        index: usize,
        from: RealizationState,
        to: RealizationState,
    },

    #[error("State map is read-only; refused to {operation}")]
    ReadOnly { operation: &'static str },

    #[error("Unknown realization state: {0}")]
    UnknownState(String),

    #[error("Failed to access state map file: {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed state map file: {path}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl StateError {
    /// Read-only violations only abort the requested mutation; callers may
    /// log them and carry on.
    pub fn is_warning(&self) -> bool {
        matches!(self, StateError::ReadOnly { .. })
    }
}
