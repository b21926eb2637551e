//! Error types for observation selection.

use thiserror::Error;

/// Result type for observation selection operations.
pub type ObsResult<T> = Result<T, ObsError>;

/// Errors raised while building or querying a local configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ObsError {
    /// Key not present in the backing collaborator or in the selection.
    #[error("Unknown key: {key} in {context}")]
    UnknownKey { key: String, context: String },

    /// Key already added to the selection.
    #[error("Duplicate key: {key} in {context}")]
    DuplicateKey { key: String, context: String },

    /// Report-step range with start after end.
    #[error("Invalid step range: [{start}, {end}]")]
    InvalidRange { start: usize, end: usize },

    /// No obsdata, dataset or ministep with this name.
    #[error("Unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },

    /// An obsdata, dataset or ministep with this name already exists.
    #[error("Duplicate {kind}: {name}")]
    DuplicateName { kind: &'static str, name: String },

    /// The item is already attached to its parent.
    #[error("{kind} {name} is already attached to {parent}")]
    AlreadyAttached {
        kind: &'static str,
        name: String,
        parent: String,
    },
}
