//! Forward-model dispatch contract.

use core::fmt;

use ert_core::ActiveRealizationMask;
use ert_fs::Case;

use crate::RunResult;

/// How parameters are initialized before a forward-model pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Sample fresh parameters for realizations that have none.
    InitConditional,
    /// Use the parameters already stored in the case.
    InitNone,
}

/// Points in a run where user workflows are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookRuntime {
    PreSimulation,
    PostSimulation,
    PreUpdate,
    PostUpdate,
}

impl fmt::Display for HookRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookRuntime::PreSimulation => "PRE_SIMULATION",
            HookRuntime::PostSimulation => "POST_SIMULATION",
            HookRuntime::PreUpdate => "PRE_UPDATE",
            HookRuntime::PostUpdate => "POST_UPDATE",
        };
        f.write_str(name)
    }
}

/// External forward-model runner.
///
/// `run_simple_step` blocks until every active realization has finished and
/// returns the realizations whose results were loaded, as a mask of the same
/// length as the run mask. Inactive realizations are never reported.
pub trait ForwardModel {
    fn create_run_path(
        &mut self,
        case: &Case,
        mask: &ActiveRealizationMask,
        iteration: usize,
    ) -> RunResult<()>;

    fn run_simple_step(
        &mut self,
        case: &Case,
        mask: &ActiveRealizationMask,
        init_mode: InitMode,
        iteration: usize,
    ) -> RunResult<ActiveRealizationMask>;

    fn run_workflows(&mut self, hook: HookRuntime, case: &Case) -> RunResult<()>;
}
