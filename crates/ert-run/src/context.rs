//! Explicit run context replacing the process-wide "current case" pointer.

use ert_config::{AnalysisConfig, ErtConfig};
use ert_core::ActiveRealizationMask;
use ert_fs::Case;
use ert_obs::UpdateSelection;
use ert_state::{RealizationState, StateError, StateMap};
use tracing::{debug, info, warn};

use crate::analysis::{ModuleRegistry, UpdateRequest};
use crate::cases::CaseManager;
use crate::forward_model::ForwardModel;
use crate::{RunError, RunResult};

/// Collaborators and mutable run state shared by the run models.
///
/// The current case changes only through [`ErtContext::switch_case`], and a
/// context drives at most one run at a time.
pub struct ErtContext {
    cases: Box<dyn CaseManager>,
    forward_model: Box<dyn ForwardModel>,
    modules: ModuleRegistry,
    analysis: AnalysisConfig,
    ensemble_size: usize,
    selection: UpdateSelection,
    current_case: Case,
}

impl ErtContext {
    /// Mounts `config.current_case` as the current case.
    pub fn new(
        config: &ErtConfig,
        mut cases: Box<dyn CaseManager>,
        forward_model: Box<dyn ForwardModel>,
        modules: ModuleRegistry,
        selection: UpdateSelection,
    ) -> RunResult<Self> {
        let current_case = cases.get_case(&config.current_case)?;
        Ok(Self {
            cases,
            forward_model,
            modules,
            analysis: config.analysis.clone(),
            ensemble_size: config.ensemble_size,
            selection,
            current_case,
        })
    }

    pub fn current_case(&self) -> &Case {
        &self.current_case
    }

    pub fn switch_case(&mut self, case: Case) {
        if case != self.current_case {
            info!(from = %self.current_case, to = %case, "Switching current case");
            self.current_case = case;
        }
    }

    pub fn get_case(&mut self, name: &str) -> RunResult<Case> {
        self.cases.get_case(name)
    }

    pub fn init_case_from_existing(
        &mut self,
        source: &Case,
        target: &Case,
        report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> RunResult<usize> {
        let count = self
            .cases
            .init_case_from_existing(source, target, report_step, mask)?;
        debug!(source = %source, target = %target, report_step, count, "Initialized case");
        Ok(count)
    }

    /// Seed the current case from `source`.
    pub fn initialize_current_case_from_existing(
        &mut self,
        source: &Case,
        report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> RunResult<usize> {
        let target = self.current_case.clone();
        self.init_case_from_existing(source, &target, report_step, mask)
    }

    pub fn set_iteration_number(&mut self, case: &Case, iteration: usize) -> RunResult<()> {
        self.cases.set_iteration_number(case, iteration)
    }

    pub fn cases(&self) -> &dyn CaseManager {
        self.cases.as_ref()
    }

    pub fn forward_model_mut(&mut self) -> &mut dyn ForwardModel {
        self.forward_model.as_mut()
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn modules_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.modules
    }

    pub fn analysis_config(&self) -> &AnalysisConfig {
        &self.analysis
    }

    pub fn ensemble_size(&self) -> usize {
        self.ensemble_size
    }

    pub fn update_selection(&self) -> &UpdateSelection {
        &self.selection
    }

    pub fn set_update_selection(&mut self, selection: UpdateSelection) {
        self.selection = selection;
    }

    pub fn reset_case_from_existing(
        &mut self,
        source: &Case,
        target: &Case,
        report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> RunResult<usize> {
        let count = self
            .cases
            .reset_case_from_existing(source, target, report_step, mask)?;
        debug!(source = %source, target = %target, report_step, count, "Reset case");
        Ok(count)
    }

    /// Run the active module's update from the current case into `target`.
    ///
    /// On success, realizations with data in the current case become
    /// `Initialized` in `target`; the other active ones are marked
    /// `ParentFailure` where the target already held them.
    pub fn smoother_update(
        &mut self,
        target: &Case,
        mask: &ActiveRealizationMask,
    ) -> RunResult<bool> {
        for ministep in self.selection.ministeps() {
            if ministep.observations.is_empty() {
                warn!(ministep = %ministep.name, "Ministep has no active observations");
            }
        }

        let module = self
            .modules
            .active_module_mut()
            .ok_or_else(|| RunError::ert_run("No analysis module selected!"))?;
        let request = UpdateRequest {
            source: &self.current_case,
            target,
            selection: &self.selection,
            mask,
        };
        if !module.smoother_update(&request)? {
            return Ok(false);
        }

        if *target != self.current_case {
            let source_map = self.cases.state_map(&self.current_case)?;
            self.write_states(target, mask, |index, current| {
                if matches!(source_map.get(index), Ok(RealizationState::HasData)) {
                    Some(RealizationState::Initialized)
                } else {
                    current
                        .can_transition_to(RealizationState::ParentFailure)
                        .then_some(RealizationState::ParentFailure)
                }
            })?;
        }
        Ok(true)
    }

    /// Mark active realizations of the current case that have no
    /// parameters yet as `Initialized`.
    pub fn mark_initialized(&mut self, mask: &ActiveRealizationMask) -> RunResult<()> {
        let case = self.current_case.clone();
        self.write_states(&case, mask, |_, current| {
            (current == RealizationState::Undefined).then_some(RealizationState::Initialized)
        })?;
        Ok(())
    }

    /// Record one forward-model pass in the current case: `HasData` for the
    /// realizations in `succeeded`, `LoadFailure` for the other active ones.
    ///
    /// Returns how many active realizations hold data afterwards, or `None`
    /// when the state map is read-only and nothing was recorded.
    pub fn record_forward_results(
        &mut self,
        mask: &ActiveRealizationMask,
        succeeded: &ActiveRealizationMask,
    ) -> RunResult<Option<usize>> {
        let case = self.current_case.clone();
        let map = self.write_states(&case, mask, |index, _| {
            Some(if succeeded.is_active(index) {
                RealizationState::HasData
            } else {
                RealizationState::LoadFailure
            })
        })?;
        Ok(map.map(|map| {
            mask.active_indices()
                .filter(|index| matches!(map.get(*index), Ok(RealizationState::HasData)))
                .count()
        }))
    }

    /// Apply `next_state` to every active realization of `case` and save the
    /// map.
    ///
    /// Illegal transitions are skipped. A read-only map is left alone with a
    /// warning and yields `None`.
    fn write_states(
        &mut self,
        case: &Case,
        mask: &ActiveRealizationMask,
        mut next_state: impl FnMut(usize, RealizationState) -> Option<RealizationState>,
    ) -> RunResult<Option<StateMap>> {
        let mut map = self.cases.state_map(case)?;
        let mut changed = false;
        for index in mask.active_indices() {
            let current = map.get(index).unwrap_or_default();
            let Some(state) = next_state(index, current) else {
                continue;
            };
            if state == current {
                continue;
            }
            match map.set(index, state) {
                Ok(()) => changed = true,
                Err(err) if err.is_warning() => {
                    warn!(case = %case, "Realization states not recorded: {err}");
                    return Ok(None);
                }
                Err(StateError::IllegalTransition { index, from, to }) => {
                    debug!(case = %case, index, %from, %to, "Skipping state change");
                }
                Err(err) => return Err(err.into()),
            }
        }
        if changed {
            self.cases.save_state_map(case, &map)?;
        }
        Ok(Some(map))
    }

    /// Realization count per state in the current case, in state order.
    pub fn state_summary(&self) -> RunResult<Vec<(RealizationState, usize)>> {
        let map = self.cases.state_map(&self.current_case)?;
        Ok(RealizationState::ALL
            .iter()
            .map(|state| (*state, map.count_matching(*state)))
            .collect())
    }
}
