//! Case storage contract.

use std::collections::BTreeMap;

use ert_core::ActiveRealizationMask;
use ert_fs::{Case, CaseStore};
use ert_state::StateMap;

use crate::RunResult;

pub trait CaseManager {
    /// Mount `name`, creating an empty case when it does not exist yet.
    fn get_case(&mut self, name: &str) -> RunResult<Case>;

    /// Seed `target` from `source` at `report_step`; returns the number of
    /// realizations initialized.
    fn init_case_from_existing(
        &mut self,
        source: &Case,
        target: &Case,
        report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> RunResult<usize>;

    /// Like `init_case_from_existing`, but discards everything `target`
    /// held before.
    fn reset_case_from_existing(
        &mut self,
        source: &Case,
        target: &Case,
        report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> RunResult<usize>;

    fn state_map(&self, case: &Case) -> RunResult<StateMap>;

    fn save_state_map(&mut self, case: &Case, map: &StateMap) -> RunResult<()>;

    fn set_iteration_number(&mut self, case: &Case, iteration: usize) -> RunResult<()>;

    fn list_cases(&self) -> RunResult<Vec<String>>;
}

impl CaseManager for CaseStore {
    fn get_case(&mut self, name: &str) -> RunResult<Case> {
        Ok(self.mount(name, true)?)
    }

    fn init_case_from_existing(
        &mut self,
        source: &Case,
        target: &Case,
        report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> RunResult<usize> {
        Ok(CaseStore::init_case_from_existing(
            self,
            source.name(),
            target.name(),
            report_step,
            mask,
        )?)
    }

    fn reset_case_from_existing(
        &mut self,
        source: &Case,
        target: &Case,
        report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> RunResult<usize> {
        Ok(CaseStore::reset_case_from_existing(
            self,
            source.name(),
            target.name(),
            report_step,
            mask,
        )?)
    }

    fn state_map(&self, case: &Case) -> RunResult<StateMap> {
        Ok(self.load_state_map(case.name())?)
    }

    fn save_state_map(&mut self, case: &Case, map: &StateMap) -> RunResult<()> {
        Ok(CaseStore::save_state_map(self, case.name(), map)?)
    }

    fn set_iteration_number(&mut self, case: &Case, iteration: usize) -> RunResult<()> {
        Ok(CaseStore::set_iteration_number(self, case.name(), iteration)?)
    }

    fn list_cases(&self) -> RunResult<Vec<String>> {
        Ok(CaseStore::list_cases(self)?)
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryCase {
    state_map: StateMap,
    iteration: usize,
}

/// Case storage kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCases {
    cases: BTreeMap<String, MemoryCase>,
}

impl MemoryCases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace `name` with `state_map`.
    pub fn insert(&mut self, name: impl Into<String>, state_map: StateMap) {
        self.cases.insert(
            name.into(),
            MemoryCase {
                state_map,
                iteration: 0,
            },
        );
    }

    pub fn iteration_number(&self, name: &str) -> Option<usize> {
        self.cases.get(name).map(|case| case.iteration)
    }

    fn existing(&self, case: &Case) -> RunResult<&MemoryCase> {
        self.cases.get(case.name()).ok_or_else(|| not_found(case))
    }
}

fn not_found(case: &Case) -> crate::RunError {
    ert_fs::FsError::CaseNotFound {
        case: case.name().to_string(),
    }
    .into()
}

impl CaseManager for MemoryCases {
    fn get_case(&mut self, name: &str) -> RunResult<Case> {
        self.cases.entry(name.to_string()).or_default();
        Ok(Case::new(name))
    }

    fn init_case_from_existing(
        &mut self,
        source: &Case,
        target: &Case,
        _report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> RunResult<usize> {
        let source_map = self.existing(source)?.state_map.clone();
        let target_case = self.cases.entry(target.name().to_string()).or_default();
        Ok(target_case.state_map.initialize_from(&source_map, mask)?)
    }

    fn reset_case_from_existing(
        &mut self,
        source: &Case,
        target: &Case,
        _report_step: usize,
        mask: &ActiveRealizationMask,
    ) -> RunResult<usize> {
        let source_map = self.existing(source)?.state_map.clone();
        let target_case = self.cases.entry(target.name().to_string()).or_default();
        Ok(target_case.state_map.reinitialize_from(&source_map, mask)?)
    }

    fn state_map(&self, case: &Case) -> RunResult<StateMap> {
        Ok(self.existing(case)?.state_map.clone())
    }

    fn save_state_map(&mut self, case: &Case, map: &StateMap) -> RunResult<()> {
        let entry = self
            .cases
            .get_mut(case.name())
            .ok_or_else(|| not_found(case))?;
        entry.state_map = map.clone();
        Ok(())
    }

    fn set_iteration_number(&mut self, case: &Case, iteration: usize) -> RunResult<()> {
        let entry = self
            .cases
            .get_mut(case.name())
            .ok_or_else(|| not_found(case))?;
        entry.iteration = iteration;
        Ok(())
    }

    fn list_cases(&self) -> RunResult<Vec<String>> {
        Ok(self.cases.keys().cloned().collect())
    }
}
