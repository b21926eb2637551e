//! Prior run, one smoother update, posterior run.

use std::sync::Arc;

use tracing::info;

use crate::base_run_model::{BaseRunModel, RunArguments, RunModel};
use crate::context::ErtContext;
use crate::forward_model::InitMode;
use crate::job_queue::JobQueue;
use crate::{RunError, RunResult};

pub struct EnsembleSmoother<'c> {
    base: BaseRunModel,
    ctx: &'c mut ErtContext,
}

impl<'c> EnsembleSmoother<'c> {
    pub fn new(ctx: &'c mut ErtContext, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            base: BaseRunModel::new("Ensemble Smoother", queue),
            ctx,
        }
    }

    pub fn context(&self) -> &ErtContext {
        &*self.ctx
    }

    fn select_module(&mut self, name: &str) -> RunResult<()> {
        let modules = self.ctx.modules_mut();
        if !modules.select_module(name) {
            return Err(RunError::ert_run(format!(
                "Unable to load analysis module '{name}'!"
            )));
        }
        let iterable = modules.active_module().is_some_and(|m| m.is_iterable());
        if iterable {
            return Err(RunError::ert_run(format!(
                "Analysis module '{name}' is iterable and cannot be used by the ensemble smoother!"
            )));
        }
        Ok(())
    }
}

impl RunModel for EnsembleSmoother<'_> {
    fn base(&self) -> &BaseRunModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseRunModel {
        &mut self.base
    }

    fn run_simulations(&mut self, args: &RunArguments) -> RunResult<()> {
        let mask = &args.active_realizations;
        self.base.set_phase_count(2)?;

        let module = args
            .analysis_module
            .clone()
            .unwrap_or_else(|| self.ctx.analysis_config().active_module.clone());
        self.select_module(&module)?;

        let target_name = args
            .target_case
            .clone()
            .or_else(|| self.ctx.analysis_config().target_case.clone())
            .ok_or_else(|| RunError::ert_run("No target case given for the ensemble smoother!"))?;
        if target_name == self.ctx.current_case().name() {
            return Err(RunError::ert_run(format!(
                "Target case '{target_name}' must differ from the current case!"
            )));
        }

        self.base
            .check_minimum_active_realizations(self.ctx, mask)?;

        self.base.set_phase(0, "Running simulations...", Some(false))?;
        self.base
            .simulate_phase(self.ctx, mask, 0, InitMode::InitConditional)?;

        let target = self.ctx.get_case(&target_name)?;
        self.ctx.set_iteration_number(&target, 1)?;
        self.base.analyze_step(self.ctx, &target, mask)?;

        self.base.set_phase(1, "Running simulations...", Some(false))?;
        info!(run_id = %self.base.run_id(), target = %target, "Switching to updated case");
        self.ctx.switch_case(target);
        self.base
            .simulate_phase(self.ctx, mask, 1, InitMode::InitNone)?;

        self.base.set_phase(2, "Simulations completed.", None)
    }
}
