//! Ensemble run models.
//!
//! This crate drives multi-phase ensemble runs on top of external
//! collaborators (case storage, forward-model dispatch, analysis modules and
//! the job queue), all reached through an explicit [`ErtContext`].
//!
//! Run models:
//! - [`EnsembleExperiment`]: one forward-model pass
//! - [`EnsembleSmoother`]: prior run, one update, posterior run
//! - [`IteratedEnsembleSmoother`]: repeated updates with bounded retries
//!
//! Every run model embeds a [`BaseRunModel`] (phase and progress bookkeeping)
//! and is started through [`RunModel::start_simulations`], which reports
//! failure as a [`RunOutcome`] instead of an error.

pub mod analysis;
pub mod base_run_model;
pub mod cases;
pub mod context;
pub mod ensemble_experiment;
pub mod ensemble_smoother;
pub mod error;
pub mod forward_model;
pub mod iterated_smoother;
pub mod job_queue;
pub mod progress;
pub mod setup;

pub use analysis::{AnalysisModule, ModuleRegistry, TypedValue, UpdateRequest, ValueKind};
pub use base_run_model::{BaseRunModel, RunArguments, RunModel, RunOutcome};
pub use cases::{CaseManager, MemoryCases};
pub use context::ErtContext;
pub use ensemble_experiment::EnsembleExperiment;
pub use ensemble_smoother::EnsembleSmoother;
pub use error::{RunError, RunResult};
pub use forward_model::{ForwardModel, HookRuntime, InitMode};
pub use iterated_smoother::IteratedEnsembleSmoother;
pub use job_queue::{JobQueue, JobStatus, SharedJobQueue};
pub use progress::{RunProgressEvent, RunStage};
pub use setup::{build_local_config, observations_from_config, parameters_from_config};
