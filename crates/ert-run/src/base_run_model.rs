//! Phase and progress bookkeeping shared by every run model.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use ert_core::ActiveRealizationMask;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::context::ErtContext;
use crate::forward_model::{HookRuntime, InitMode};
use crate::job_queue::{JobQueue, JobStatus};
use crate::progress::{RunProgressEvent, RunStage};
use crate::{RunError, RunResult};

/// Arguments of one run.
#[derive(Debug, Clone)]
pub struct RunArguments {
    pub active_realizations: ActiveRealizationMask,
    /// Analysis module to use; the configured module when `None`.
    pub analysis_module: Option<String>,
    /// Target case (smoother) or target case format (iterated smoother);
    /// the configured value when `None`.
    pub target_case: Option<String>,
}

impl RunArguments {
    pub fn new(active_realizations: ActiveRealizationMask) -> Self {
        Self {
            active_realizations,
            analysis_module: None,
            target_case: None,
        }
    }
}

/// How a started run ended.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

type ProgressListener = Box<dyn FnMut(RunProgressEvent)>;

/// Phase state machine of a run.
///
/// A run moves from phase 0 through `phase_count - 1` and finishes when the
/// phase reaches `phase_count`, or fails through [`BaseRunModel::fail`].
pub struct BaseRunModel {
    name: &'static str,
    run_id: Uuid,
    queue: Arc<dyn JobQueue>,
    phase: usize,
    phase_count: usize,
    phase_update_count: usize,
    phase_name: String,
    indeterminate: bool,
    start_time: Option<DateTime<Utc>>,
    stop_time: Option<DateTime<Utc>>,
    failed: bool,
    fail_message: String,
    listener: Option<ProgressListener>,
}

impl BaseRunModel {
    pub fn new(name: &'static str, queue: Arc<dyn JobQueue>) -> Self {
        Self {
            name,
            run_id: Uuid::new_v4(),
            queue,
            phase: 0,
            phase_count: 1,
            phase_update_count: 0,
            phase_name: "Starting...".to_string(),
            indeterminate: false,
            start_time: None,
            stop_time: None,
            failed: false,
            fail_message: String::new(),
            listener: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn set_progress_listener(&mut self, listener: impl FnMut(RunProgressEvent) + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn phase(&self) -> usize {
        self.phase
    }

    pub fn phase_count(&self) -> usize {
        self.phase_count
    }

    /// Store `count` and restart at phase 0.
    pub fn set_phase_count(&mut self, count: usize) -> RunResult<()> {
        if count == 0 {
            return Err(RunError::InvalidPhaseCount);
        }
        self.phase_count = count;
        self.set_phase(0, "", None)
    }

    /// Enter `phase`, which must lie in `[0, phase_count]`.
    ///
    /// Phase 0 stamps the start time and `phase_count` the stop time. An
    /// out-of-range phase changes nothing.
    pub fn set_phase(
        &mut self,
        phase: usize,
        phase_name: &str,
        indeterminate: Option<bool>,
    ) -> RunResult<()> {
        if phase > self.phase_count {
            return Err(RunError::InvalidPhase {
                phase,
                phase_count: self.phase_count,
            });
        }

        self.phase_name = phase_name.to_string();
        if let Some(indeterminate) = indeterminate {
            self.indeterminate = indeterminate;
        }
        if phase == 0 {
            self.start_time = Some(Utc::now());
        }
        if phase == self.phase_count {
            self.stop_time = Some(Utc::now());
        }
        self.phase = phase;
        self.phase_update_count = 0;

        if phase == self.phase_count {
            info!(run_id = %self.run_id, model = self.name, phase, "{phase_name}");
            self.emit(RunStage::Completed, None);
        } else {
            self.emit(RunStage::Running, None);
        }
        Ok(())
    }

    pub fn phase_name(&self) -> &str {
        &self.phase_name
    }

    pub fn set_phase_name(&mut self, phase_name: &str, indeterminate: Option<bool>) {
        self.phase_name = phase_name.to_string();
        if let Some(indeterminate) = indeterminate {
            self.indeterminate = indeterminate;
        }
        self.phase_update_count += 1;
        self.emit(RunStage::Running, None);
    }

    pub fn is_indeterminate(&self) -> bool {
        !self.is_finished() && self.indeterminate
    }

    pub fn is_finished(&self) -> bool {
        self.phase == self.phase_count || self.failed
    }

    pub fn has_run_failed(&self) -> bool {
        self.failed
    }

    pub fn fail_message(&self) -> &str {
        &self.fail_message
    }

    /// Record a failure and stop the clock.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.failed = true;
        self.fail_message = message.into();
        self.stop_time = Some(Utc::now());
        let message = self.fail_message.clone();
        self.emit(RunStage::Failed, Some(message));
    }

    /// Clear failure state and return to phase 0.
    pub fn reset(&mut self) {
        self.failed = false;
        self.fail_message.clear();
        self.phase = 0;
        self.phase_update_count = 0;
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<DateTime<Utc>> {
        self.stop_time
    }

    /// Wall time since the run started; frozen once it has stopped.
    pub fn running_time(&self) -> Duration {
        match (self.start_time, self.stop_time) {
            (Some(start), Some(stop)) if stop >= start => stop - start,
            (Some(start), _) => Utc::now() - start,
            (None, _) => Duration::zero(),
        }
    }

    /// Queue length, never less than 1.
    pub fn queue_size(&self) -> usize {
        self.queue.len().max(1)
    }

    /// Jobs per status; empty unless the queue is running.
    pub fn queue_status(&self) -> BTreeMap<JobStatus, usize> {
        let mut status = BTreeMap::new();
        if self.queue.is_running() {
            for index in 0..self.queue.len() {
                *status.entry(self.queue.job_status(index)).or_insert(0) += 1;
            }
        }
        status
    }

    pub fn is_queue_running(&self) -> bool {
        self.queue.is_running()
    }

    /// Overall progress in `[0, 1]`; exactly 1 once finished.
    pub fn progress(&self) -> f64 {
        if self.is_finished() {
            return 1.0;
        }
        let done: usize = self
            .queue_status()
            .iter()
            .filter(|(status, _)| status.is_done())
            .map(|(_, count)| count)
            .sum();
        let within_phase = done as f64 / self.queue_size() as f64;
        ((self.phase as f64 + within_phase) / self.phase_count as f64).min(1.0)
    }

    pub fn kill_all_simulations(&self) {
        warn!(run_id = %self.run_id, model = self.name, "Killing all simulations");
        self.queue.kill_all_jobs();
    }

    pub fn user_exit_called(&self) -> bool {
        self.queue.user_exit()
    }

    /// Fail unless at least `min_realizations` realizations are active.
    pub fn check_minimum_active_realizations(
        &self,
        ctx: &ErtContext,
        mask: &ActiveRealizationMask,
    ) -> RunResult<()> {
        let active = mask.count_active();
        if active == 0 || active < ctx.analysis_config().min_realizations {
            return Err(RunError::ert_run(
                "Number of active realizations is less than the specified MIN_REALIZATIONS in the config file",
            ));
        }
        Ok(())
    }

    /// Fail on zero successes or fewer than `min_realizations`.
    pub fn check_have_sufficient_realizations(
        &self,
        ctx: &ErtContext,
        successes: usize,
    ) -> RunResult<()> {
        let min_realizations = ctx.analysis_config().min_realizations;
        if successes == 0 {
            return Err(RunError::ert_run("Simulation failed! All realizations failed!"));
        }
        if successes < min_realizations {
            return Err(RunError::ert_run(format!(
                "Too many simulations have failed! Number of successful realizations less than MIN_REALIZATIONS {successes} < {min_realizations}"
            )));
        }
        Ok(())
    }

    /// Forward-model pass over the current case.
    ///
    /// Run paths and PRE_SIMULATION workflows run before the forward model,
    /// POST_SIMULATION workflows after the sufficiency check. The outcome of
    /// every active realization is recorded in the case's state map, and the
    /// returned success count is read back from it. When the map is
    /// read-only, the count reported by the forward model is used instead.
    pub fn simulate_phase(
        &mut self,
        ctx: &mut ErtContext,
        mask: &ActiveRealizationMask,
        iteration: usize,
        init_mode: InitMode,
    ) -> RunResult<usize> {
        let case = ctx.current_case().clone();

        self.set_phase_name("Pre processing...", Some(true));
        if init_mode == InitMode::InitConditional {
            ctx.mark_initialized(mask)?;
        }
        ctx.forward_model_mut()
            .create_run_path(&case, mask, iteration)?;
        ctx.forward_model_mut()
            .run_workflows(HookRuntime::PreSimulation, &case)?;

        self.set_phase_name("Running forecast...", Some(false));
        let succeeded = ctx
            .forward_model_mut()
            .run_simple_step(&case, mask, init_mode, iteration)?;
        let reported = mask
            .active_indices()
            .filter(|index| succeeded.is_active(*index))
            .count();
        let successes = ctx
            .record_forward_results(mask, &succeeded)?
            .unwrap_or(reported);
        info!(
            run_id = %self.run_id,
            case = %case,
            iteration,
            successes,
            reported,
            active = mask.count_active(),
            "Forward model finished"
        );
        self.check_have_sufficient_realizations(ctx, successes)?;

        self.set_phase_name("Post processing...", Some(true));
        ctx.forward_model_mut()
            .run_workflows(HookRuntime::PostSimulation, &case)?;

        match ctx.state_summary() {
            Ok(summary) => {
                for (state, count) in summary.into_iter().filter(|(_, count)| *count > 0) {
                    info!(case = %case, %state, count, "Realization states");
                }
            }
            Err(err) => warn!(case = %case, "Could not read state map: {err}"),
        }
        Ok(successes)
    }

    /// Update from the current case into `target`, wrapped in the
    /// PRE_UPDATE and POST_UPDATE workflows.
    pub fn analyze_step(
        &mut self,
        ctx: &mut ErtContext,
        target: &ert_fs::Case,
        mask: &ActiveRealizationMask,
    ) -> RunResult<()> {
        let source = ctx.current_case().clone();

        self.set_phase_name("Analyzing...", Some(true));
        self.set_phase_name("Pre processing update...", Some(true));
        ctx.forward_model_mut()
            .run_workflows(HookRuntime::PreUpdate, &source)?;

        info!(run_id = %self.run_id, source = %source, target = %target, "Running smoother update");
        if !ctx.smoother_update(target, mask)? {
            return Err(RunError::ert_run("Analysis of simulation failed!"));
        }

        self.set_phase_name("Post processing update...", Some(true));
        ctx.forward_model_mut()
            .run_workflows(HookRuntime::PostUpdate, &source)?;
        Ok(())
    }

    fn emit(&mut self, stage: RunStage, message: Option<String>) {
        if self.listener.is_none() {
            return;
        }
        let event = RunProgressEvent {
            run_id: self.run_id,
            model: self.name,
            stage,
            phase: self.phase,
            phase_count: self.phase_count,
            phase_name: self.phase_name.clone(),
            indeterminate: self.is_indeterminate(),
            progress: self.progress(),
            elapsed_wall_s: self.running_time().num_milliseconds() as f64 / 1000.0,
            message,
        };
        if let Some(listener) = self.listener.as_mut() {
            listener(event);
        }
    }
}

/// A run model: a [`BaseRunModel`] plus the phase sequence it drives.
pub trait RunModel {
    fn base(&self) -> &BaseRunModel;

    fn base_mut(&mut self) -> &mut BaseRunModel;

    /// The phase sequence; errors end the run.
    fn run_simulations(&mut self, args: &RunArguments) -> RunResult<()>;

    /// Run to completion, recording any error as the failure message.
    fn start_simulations(&mut self, args: &RunArguments) -> RunOutcome {
        self.base_mut().reset();
        match self.run_simulations(args) {
            Ok(()) => RunOutcome::Success,
            Err(err) => {
                let base = self.base_mut();
                if err.is_run_failure() {
                    warn!(run_id = %base.run_id(), model = base.name(), "Run failed: {err}");
                } else {
                    error!(run_id = %base.run_id(), model = base.name(), "Run aborted: {err}");
                }
                let message = err.to_string();
                base.fail(message.clone());
                RunOutcome::Failed(message)
            }
        }
    }

    fn kill_all_simulations(&self) {
        self.base().kill_all_simulations();
    }
}
