#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use ert_config::ErtConfig;
use ert_core::ActiveRealizationMask;
use ert_fs::Case;
use ert_obs::UpdateSelection;
use ert_run::analysis::ITER_VARIABLE;
use ert_run::*;

pub type Log = Rc<RefCell<Vec<String>>>;

pub fn config(
    ensemble_size: usize,
    min_realizations: usize,
    num_iterations: usize,
    num_retries: usize,
) -> ErtConfig {
    let mut config = ErtConfig::new(ensemble_size);
    config.analysis.min_realizations = min_realizations;
    config.analysis.active_module = "IES_ENKF".to_string();
    config.analysis.iteration.num_iterations = num_iterations;
    config.analysis.iteration.num_retries_per_iteration = num_retries;
    config.analysis.iteration.case_format = "iter-%d".to_string();
    config
}

/// Forward model that reports scripted success counts and mirrors them on the
/// job queue.
pub struct ScriptedForwardModel {
    successes: VecDeque<usize>,
    queue: Arc<SharedJobQueue>,
    log: Log,
}

impl ForwardModel for ScriptedForwardModel {
    fn create_run_path(
        &mut self,
        case: &Case,
        _mask: &ActiveRealizationMask,
        iteration: usize,
    ) -> RunResult<()> {
        self.log
            .borrow_mut()
            .push(format!("run_path {case} {iteration}"));
        Ok(())
    }

    fn run_simple_step(
        &mut self,
        case: &Case,
        mask: &ActiveRealizationMask,
        init_mode: InitMode,
        iteration: usize,
    ) -> RunResult<ActiveRealizationMask> {
        let successes = self
            .successes
            .pop_front()
            .unwrap_or_else(|| mask.count_active());
        let mut succeeded = ActiveRealizationMask::new(mask.len(), false);
        self.queue.start(mask.len());
        for (rank, index) in mask.active_indices().enumerate() {
            let status = if rank < successes {
                succeeded.set(index, true).unwrap();
                JobStatus::Success
            } else {
                JobStatus::Failed
            };
            self.queue.set_status(index, status);
        }
        self.queue.finish();
        self.log
            .borrow_mut()
            .push(format!("forward {case} {iteration} {init_mode:?}"));
        Ok(succeeded)
    }

    fn run_workflows(&mut self, hook: HookRuntime, case: &Case) -> RunResult<()> {
        self.log.borrow_mut().push(format!("workflow {hook} {case}"));
        Ok(())
    }
}

/// Analysis module whose `ITER` counter advances according to a script.
pub struct ScriptedModule {
    pub name: &'static str,
    pub iterable: bool,
    pub iter: i64,
    /// Per-update advance decisions; `default_advance` once exhausted.
    pub advances: VecDeque<bool>,
    pub default_advance: bool,
    pub update_ok: bool,
    pub log: Log,
}

impl ScriptedModule {
    pub fn new(name: &'static str, iterable: bool) -> Self {
        Self {
            name,
            iterable,
            iter: 0,
            advances: VecDeque::new(),
            default_advance: true,
            update_ok: true,
            log: Log::default(),
        }
    }

    pub fn never_advancing(mut self) -> Self {
        self.default_advance = false;
        self
    }

    pub fn with_advances(mut self, advances: &[bool]) -> Self {
        self.advances = advances.iter().copied().collect();
        self
    }

    pub fn failing(mut self) -> Self {
        self.update_ok = false;
        self
    }
}

impl AnalysisModule for ScriptedModule {
    fn name(&self) -> &str {
        self.name
    }

    fn is_iterable(&self) -> bool {
        self.iterable
    }

    fn get(&self, variable: &str) -> Option<TypedValue> {
        (variable == ITER_VARIABLE).then_some(TypedValue::Int(self.iter))
    }

    fn smoother_update(&mut self, request: &UpdateRequest<'_>) -> RunResult<bool> {
        self.log
            .borrow_mut()
            .push(format!("update {}->{}", request.source, request.target));
        if self.advances.pop_front().unwrap_or(self.default_advance) {
            self.iter += 1;
        }
        Ok(self.update_ok)
    }
}

pub struct Harness {
    pub ctx: ErtContext,
    pub queue: Arc<SharedJobQueue>,
    pub log: Log,
}

impl Harness {
    pub fn new(config: &ErtConfig, successes: &[usize], modules: Vec<ScriptedModule>) -> Self {
        let log = Log::default();
        let queue = Arc::new(SharedJobQueue::new());

        let forward_model = ScriptedForwardModel {
            successes: successes.iter().copied().collect(),
            queue: queue.clone(),
            log: log.clone(),
        };
        let mut registry = ModuleRegistry::new();
        for mut module in modules {
            module.log = log.clone();
            registry.register(Box::new(module));
        }

        let ctx = ErtContext::new(
            config,
            Box::new(MemoryCases::new()),
            Box::new(forward_model),
            registry,
            UpdateSelection::default(),
        )
        .unwrap();
        Self { ctx, queue, log }
    }

    pub fn events(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }
}

pub fn all_active(len: usize) -> RunArguments {
    RunArguments::new(ActiveRealizationMask::all(len))
}
