//! Run configuration schema.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErtConfig {
    pub version: u32,
    pub ensemble_size: usize,
    /// Root directory of the case store.
    #[serde(default = "default_storage")]
    pub storage: PathBuf,
    #[serde(default = "default_case")]
    pub current_case: String,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub observations: Vec<ObservationDef>,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_config: Option<LocalConfigDef>,
}

impl ErtConfig {
    /// Minimal config for `ensemble_size` realizations with ERT defaults.
    pub fn new(ensemble_size: usize) -> Self {
        Self {
            version: LATEST_VERSION,
            ensemble_size,
            storage: default_storage(),
            current_case: default_case(),
            analysis: AnalysisConfig::default(),
            observations: Vec::new(),
            parameters: Vec::new(),
            local_config: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Minimum number of successful realizations; 0 only rejects total failure.
    #[serde(default)]
    pub min_realizations: usize,
    #[serde(default = "default_module")]
    pub active_module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_case: Option<String>,
    #[serde(default)]
    pub iteration: AnalysisIterConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_realizations: 0,
            active_module: default_module(),
            target_case: None,
            iteration: AnalysisIterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisIterConfig {
    #[serde(default = "default_num_iterations")]
    pub num_iterations: usize,
    #[serde(default = "default_num_retries")]
    pub num_retries_per_iteration: usize,
    /// Case name pattern with a single `%d` for the iteration number.
    #[serde(default = "default_case_format")]
    pub case_format: String,
}

impl AnalysisIterConfig {
    pub fn case_name(&self, iteration: usize) -> String {
        self.case_format.replacen("%d", &iteration.to_string(), 1)
    }
}

impl Default for AnalysisIterConfig {
    fn default() -> Self {
        Self {
            num_iterations: default_num_iterations(),
            num_retries_per_iteration: default_num_retries(),
            case_format: default_case_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservationDef {
    pub key: String,
    #[serde(default)]
    pub steps: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocalConfigDef {
    #[serde(default)]
    pub ministeps: Vec<MinistepDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MinistepDef {
    pub name: String,
    #[serde(default)]
    pub observations: Vec<ObsSelectionDef>,
    #[serde(default)]
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObsSelectionDef {
    pub key: String,
    /// Inclusive report-step range; absent means all steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<StepRangeDef>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepRangeDef {
    pub start: usize,
    pub end: usize,
}

fn default_storage() -> PathBuf {
    PathBuf::from("storage")
}

fn default_case() -> String {
    "default".to_string()
}

fn default_module() -> String {
    "STD_ENKF".to_string()
}

fn default_num_iterations() -> usize {
    4
}

fn default_num_retries() -> usize {
    4
}

fn default_case_format() -> String {
    "ITERATED_ENSEMBLE_SMOOTHER%d".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_name_substitutes_iteration() {
        let iter = AnalysisIterConfig::default();
        assert_eq!(iter.case_name(0), "ITERATED_ENSEMBLE_SMOOTHER0");
        assert_eq!(iter.case_name(12), "ITERATED_ENSEMBLE_SMOOTHER12");

        let custom = AnalysisIterConfig {
            case_format: "iter_%d_case".to_string(),
            ..AnalysisIterConfig::default()
        };
        assert_eq!(custom.case_name(3), "iter_3_case");
    }

    #[test]
    fn minimal_yaml_fills_defaults() {
        let config: ErtConfig = serde_yaml::from_str("version: 1\nensemble_size: 10\n").unwrap();
        assert_eq!(config, ErtConfig::new(10));
        assert_eq!(config.analysis.iteration.num_iterations, 4);
        assert_eq!(config.analysis.iteration.num_retries_per_iteration, 4);
        assert_eq!(config.current_case, "default");
    }
}
