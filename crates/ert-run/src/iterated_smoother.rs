//! Iterated ensemble smoother control loop.
//!
//! Phase 0 runs the initial ensemble. Every later phase first updates the
//! current case into the iteration's target case, then reruns the forward
//! model. Whether an update was accepted is decided by the module's `ITER`
//! counter: it must strictly increase across the update. A rejected update
//! discards the target case, reseeds it from the current case and reruns the
//! previous phase; it counts as a retry. Retries reset on every accepted
//! update.

use std::sync::Arc;

use ert_config::AnalysisIterConfig;
use tracing::{info, warn};

use crate::analysis::ITER_VARIABLE;
use crate::base_run_model::{BaseRunModel, RunArguments, RunModel};
use crate::context::ErtContext;
use crate::forward_model::InitMode;
use crate::job_queue::JobQueue;
use crate::{RunError, RunResult};

pub struct IteratedEnsembleSmoother<'c> {
    base: BaseRunModel,
    ctx: &'c mut ErtContext,
    current_iteration: usize,
    num_retries: usize,
}

impl<'c> IteratedEnsembleSmoother<'c> {
    pub fn new(ctx: &'c mut ErtContext, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            base: BaseRunModel::new("Iterated Ensemble Smoother", queue),
            ctx,
            current_iteration: 0,
            num_retries: 0,
        }
    }

    pub fn context(&self) -> &ErtContext {
        &*self.ctx
    }

    /// Next iteration to produce; equals the phase count after success.
    pub fn current_iteration(&self) -> usize {
        self.current_iteration
    }

    /// Rejected updates since the last accepted one.
    pub fn num_retries(&self) -> usize {
        self.num_retries
    }

    fn select_module(&mut self, name: &str) -> RunResult<()> {
        let modules = self.ctx.modules_mut();
        if !modules.select_module(name) {
            return Err(RunError::ert_run(format!(
                "Unable to load analysis module '{name}'!"
            )));
        }
        let iterable = modules.active_module().is_some_and(|m| m.is_iterable());
        if !iterable {
            return Err(RunError::ert_run(format!(
                "Analysis module '{name}' is not iterable!"
            )));
        }
        Ok(())
    }

    fn iteration_counter(&self, module: &str) -> RunResult<i64> {
        let module = self.ctx.modules().module(module).ok_or_else(|| {
            RunError::ert_run(format!("Unable to load analysis module '{module}'!"))
        })?;
        module.get_int(ITER_VARIABLE)
    }

    fn run_and_post_process(
        &mut self,
        args: &RunArguments,
        phase: usize,
        init_mode: InitMode,
    ) -> RunResult<usize> {
        let phase_count = self.base.phase_count();
        self.base.set_phase(
            phase,
            &format!(
                "Running iteration {phase} of {} simulation iterations...",
                phase_count - 1
            ),
            Some(false),
        )?;
        self.base
            .simulate_phase(self.ctx, &args.active_realizations, phase, init_mode)
    }
}

impl RunModel for IteratedEnsembleSmoother<'_> {
    fn base(&self) -> &BaseRunModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseRunModel {
        &mut self.base
    }

    fn run_simulations(&mut self, args: &RunArguments) -> RunResult<()> {
        let mask = &args.active_realizations;
        let mut iter_config = self.ctx.analysis_config().iteration.clone();
        if let Some(format) = &args.target_case {
            if format.matches("%d").count() != 1 {
                return Err(RunError::ert_run(format!(
                    "Target case format '{format}' must contain exactly one %d!"
                )));
            }
            iter_config = AnalysisIterConfig {
                case_format: format.clone(),
                ..iter_config
            };
        }

        let phase_count = iter_config.num_iterations + 1;
        self.base.set_phase_count(phase_count)?;
        self.current_iteration = 0;
        self.num_retries = 0;

        let module = args
            .analysis_module
            .clone()
            .unwrap_or_else(|| self.ctx.analysis_config().active_module.clone());
        self.select_module(&module)?;
        self.base
            .check_minimum_active_realizations(self.ctx, mask)?;

        let source = self.ctx.current_case().clone();
        let initial = self.ctx.get_case(&iter_config.case_name(0))?;
        if initial != source {
            self.ctx.switch_case(initial);
            self.ctx
                .initialize_current_case_from_existing(&source, 0, mask)?;
        }
        self.run_and_post_process(args, 0, InitMode::InitConditional)?;

        let max_retries = iter_config.num_retries_per_iteration;
        self.current_iteration = 1;
        while self.current_iteration < phase_count && self.num_retries < max_retries {
            let target = self
                .ctx
                .get_case(&iter_config.case_name(self.current_iteration))?;
            self.ctx
                .set_iteration_number(&target, self.current_iteration)?;

            let pre = self.iteration_counter(&module)?;
            self.base.analyze_step(self.ctx, &target, mask)?;
            let post = self.iteration_counter(&module)?;

            if post > pre {
                info!(
                    run_id = %self.base.run_id(),
                    iteration = self.current_iteration,
                    target = %target,
                    "Update accepted"
                );
                self.ctx.switch_case(target);
                self.run_and_post_process(args, self.current_iteration, InitMode::InitNone)?;
                self.num_retries = 0;
                self.current_iteration += 1;
            } else {
                self.num_retries += 1;
                warn!(
                    run_id = %self.base.run_id(),
                    iteration = self.current_iteration,
                    retries = self.num_retries,
                    "Update rejected, rerunning previous iteration"
                );
                let current = self.ctx.current_case().clone();
                self.ctx.reset_case_from_existing(&current, &target, 0, mask)?;
                self.run_and_post_process(args, self.current_iteration - 1, InitMode::InitNone)?;
            }
        }

        if self.current_iteration == phase_count {
            self.base.set_phase(phase_count, "Simulations completed.", None)
        } else {
            Err(RunError::ert_run(format!(
                "Iterated Ensemble Smoother stopped: maximum number of iteration retries ({max_retries} retries) reached for iteration {}",
                self.current_iteration
            )))
        }
    }
}
