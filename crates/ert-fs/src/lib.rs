//! ert-fs: file-backed case storage.

pub mod store;
pub mod types;

pub use store::CaseStore;
pub use types::*;

use std::path::PathBuf;

pub type FsResult<T> = Result<T, FsError>;

#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("State map error: {0}")]
    State(#[from] ert_state::StateError),

    #[error("Case not found: {case}")]
    CaseNotFound { case: String },

    #[error("Invalid case name: '{name}'")]
    InvalidCaseName { name: String },
}
