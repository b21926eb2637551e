//! Analysis module contract and registry.
//!
//! Modules expose their internal variables through [`TypedValue`], so a
//! caller asking for an integer either gets one or a
//! [`RunError::ModuleVariable`] naming what was found instead.

use core::fmt;

use ert_core::ActiveRealizationMask;
use ert_fs::Case;
use ert_obs::UpdateSelection;

use crate::{RunError, RunResult};

/// Name of the iteration counter an iterable module advances on every
/// accepted update.
pub const ITER_VARIABLE: &str = "ITER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Double,
    Bool,
    Str,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::Bool => "bool",
            ValueKind::Str => "string",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Int(i64),
    Double(f64),
    Bool(bool),
    Str(String),
}

impl TypedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::Int(_) => ValueKind::Int,
            TypedValue::Double(_) => ValueKind::Double,
            TypedValue::Bool(_) => ValueKind::Bool,
            TypedValue::Str(_) => ValueKind::Str,
        }
    }
}

/// Inputs of one smoother update.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRequest<'a> {
    pub source: &'a Case,
    pub target: &'a Case,
    pub selection: &'a UpdateSelection,
    pub mask: &'a ActiveRealizationMask,
}

pub trait AnalysisModule {
    fn name(&self) -> &str;

    /// Iterable modules keep an [`ITER_VARIABLE`] counter across updates.
    fn is_iterable(&self) -> bool;

    fn get(&self, variable: &str) -> Option<TypedValue>;

    /// Compute the updated ensemble into `request.target`; `false` means the
    /// analysis failed.
    fn smoother_update(&mut self, request: &UpdateRequest<'_>) -> RunResult<bool>;

    fn get_int(&self, variable: &str) -> RunResult<i64> {
        match self.get(variable) {
            Some(TypedValue::Int(value)) => Ok(value),
            other => Err(mismatch(self.name(), variable, ValueKind::Int, other)),
        }
    }

    fn get_double(&self, variable: &str) -> RunResult<f64> {
        match self.get(variable) {
            Some(TypedValue::Double(value)) => Ok(value),
            other => Err(mismatch(self.name(), variable, ValueKind::Double, other)),
        }
    }

    fn get_bool(&self, variable: &str) -> RunResult<bool> {
        match self.get(variable) {
            Some(TypedValue::Bool(value)) => Ok(value),
            other => Err(mismatch(self.name(), variable, ValueKind::Bool, other)),
        }
    }

    fn get_str(&self, variable: &str) -> RunResult<String> {
        match self.get(variable) {
            Some(TypedValue::Str(value)) => Ok(value),
            other => Err(mismatch(self.name(), variable, ValueKind::Str, other)),
        }
    }
}

fn mismatch(
    module: &str,
    variable: &str,
    expected: ValueKind,
    found: Option<TypedValue>,
) -> RunError {
    RunError::ModuleVariable {
        module: module.to_string(),
        variable: variable.to_string(),
        expected,
        found: found.map_or_else(|| "nothing".to_string(), |value| value.kind().to_string()),
    }
}

/// Loaded analysis modules with one optional active selection.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn AnalysisModule>>,
    active: Option<usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `module`, replacing a module with the same name.
    pub fn register(&mut self, module: Box<dyn AnalysisModule>) {
        match self.position(module.name()) {
            Some(index) => self.modules[index] = module,
            None => self.modules.push(module),
        }
    }

    /// Make `name` the active module; `false` when it is not loaded.
    pub fn select_module(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.active = Some(index);
                true
            }
            None => false,
        }
    }

    pub fn module(&self, name: &str) -> Option<&dyn AnalysisModule> {
        self.position(name).map(|index| self.modules[index].as_ref())
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut (dyn AnalysisModule + 'static)> {
        let index = self.position(name)?;
        Some(self.modules[index].as_mut())
    }

    pub fn active_module(&self) -> Option<&dyn AnalysisModule> {
        self.active.map(|index| self.modules[index].as_ref())
    }

    pub fn active_module_mut(&mut self) -> Option<&mut (dyn AnalysisModule + 'static)> {
        let index = self.active?;
        Some(self.modules[index].as_mut())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|module| module.name())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|module| module.name() == name)
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("modules", &self.names().collect::<Vec<_>>())
            .field("active", &self.active_module().map(|m| m.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        iter: i64,
    }

    impl AnalysisModule for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn is_iterable(&self) -> bool {
            true
        }

        fn get(&self, variable: &str) -> Option<TypedValue> {
            match variable {
                ITER_VARIABLE => Some(TypedValue::Int(self.iter)),
                "TRUNCATION" => Some(TypedValue::Double(0.98)),
                _ => None,
            }
        }

        fn smoother_update(&mut self, _request: &UpdateRequest<'_>) -> RunResult<bool> {
            self.iter += 1;
            Ok(true)
        }
    }

    #[test]
    fn typed_getters_check_kind() {
        let module = Fixed { name: "IES", iter: 3 };
        assert_eq!(module.get_int(ITER_VARIABLE).unwrap(), 3);
        assert_eq!(module.get_double("TRUNCATION").unwrap(), 0.98);

        match module.get_int("TRUNCATION") {
            Err(RunError::ModuleVariable {
                expected, found, ..
            }) => {
                assert_eq!(expected, ValueKind::Int);
                assert_eq!(found, "double");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            module.get_bool("MISSING"),
            Err(RunError::ModuleVariable { .. })
        ));
    }

    #[test]
    fn registry_selects_by_name() {
        let mut registry = ModuleRegistry::new();
        registry.register(Box::new(Fixed { name: "STD_ENKF", iter: 0 }));
        registry.register(Box::new(Fixed { name: "IES_ENKF", iter: 0 }));
        assert_eq!(registry.len(), 2);
        assert!(registry.active_module().is_none());

        assert!(!registry.select_module("RML_ENKF"));
        assert!(registry.select_module("IES_ENKF"));
        assert_eq!(registry.active_module().map(|m| m.name()), Some("IES_ENKF"));

        registry.register(Box::new(Fixed { name: "IES_ENKF", iter: 7 }));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.module("IES_ENKF").unwrap().get_int(ITER_VARIABLE).unwrap(), 7);
    }
}
