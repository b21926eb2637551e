//! Single forward-model pass over the current case.

use std::sync::Arc;

use tracing::info;

use crate::base_run_model::{BaseRunModel, RunArguments, RunModel};
use crate::context::ErtContext;
use crate::forward_model::InitMode;
use crate::job_queue::JobQueue;
use crate::RunResult;

pub struct EnsembleExperiment<'c> {
    base: BaseRunModel,
    ctx: &'c mut ErtContext,
}

impl<'c> EnsembleExperiment<'c> {
    pub fn new(ctx: &'c mut ErtContext, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            base: BaseRunModel::new("Ensemble Experiment", queue),
            ctx,
        }
    }

    pub fn context(&self) -> &ErtContext {
        &*self.ctx
    }
}

impl RunModel for EnsembleExperiment<'_> {
    fn base(&self) -> &BaseRunModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseRunModel {
        &mut self.base
    }

    fn run_simulations(&mut self, args: &RunArguments) -> RunResult<()> {
        let mask = &args.active_realizations;
        self.base.set_phase_count(1)?;
        self.base
            .check_minimum_active_realizations(self.ctx, mask)?;

        self.base.set_phase(0, "Running simulations...", Some(false))?;
        self.base
            .simulate_phase(self.ctx, mask, 0, InitMode::InitConditional)?;

        info!(run_id = %self.base.run_id(), case = %self.ctx.current_case(), "Ensemble experiment done");
        self.base.set_phase(1, "Simulations completed.", None)
    }
}
