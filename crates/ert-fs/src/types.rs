//! Case handle and per-case metadata.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Handle to one mounted case; cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Case {
    name: String,
}

impl Case {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for Case {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseConfig {
    #[serde(default)]
    pub iteration_number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initialized_from: Option<InitSource>,
}

/// Where a case's initial ensemble was copied from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitSource {
    pub case: String,
    pub report_step: usize,
}
