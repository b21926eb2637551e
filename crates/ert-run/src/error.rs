//! Error types for the run layer.

use crate::analysis::ValueKind;

/// Errors raised while driving a run.
///
/// [`RunError::ErtRun`] is the expected way for a run to stop early; it is
/// recorded by [`crate::RunModel::start_simulations`] rather than escaping.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("{message}")]
    ErtRun { message: String },

    #[error("Phase must be from 0 to {phase_count}, got {phase}")]
    InvalidPhase { phase: usize, phase_count: usize },

    #[error("Phase count must be at least 1")]
    InvalidPhaseCount,

    #[error("Analysis module '{module}': variable {variable} should be {expected}, found {found}")]
    ModuleVariable {
        module: String,
        variable: String,
        expected: ValueKind,
        found: String,
    },

    #[error("Case storage error: {0}")]
    Fs(#[from] ert_fs::FsError),

    #[error("State map error: {0}")]
    State(#[from] ert_state::StateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ert_config::ConfigError),

    #[error("Local configuration error: {0}")]
    Obs(#[from] ert_obs::ObsError),
}

impl RunError {
    pub fn ert_run(message: impl Into<String>) -> Self {
        RunError::ErtRun {
            message: message.into(),
        }
    }

    /// Run-failure errors end a run without indicating a bug.
    pub fn is_run_failure(&self) -> bool {
        matches!(self, RunError::ErtRun { .. })
    }
}

/// Result type for ert-run operations.
pub type RunResult<T> = Result<T, RunError>;
