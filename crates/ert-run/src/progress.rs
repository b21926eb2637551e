//! Progress events emitted by run models.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Running,
    Completed,
    Failed,
}

/// Snapshot of a run, sent on every phase change and on failure.
#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub run_id: Uuid,
    /// Display name of the run model.
    pub model: &'static str,
    pub stage: RunStage,
    pub phase: usize,
    pub phase_count: usize,
    pub phase_name: String,
    pub indeterminate: bool,
    /// Overall progress in `[0, 1]`.
    pub progress: f64,
    pub elapsed_wall_s: f64,
    /// Failure message for [`RunStage::Failed`] events.
    pub message: Option<String>,
}
