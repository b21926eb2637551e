//! Backing key universes that selections are validated against.

use std::collections::{BTreeMap, BTreeSet};

/// The full set of observations known to the run ("all observations").
pub trait ObservationSet {
    fn has_key(&self, key: &str) -> bool;

    /// All observation keys, sorted.
    fn keys(&self) -> Vec<String>;

    /// Report steps with data for `key`, ascending; `None` for unknown keys.
    fn steps(&self, key: &str) -> Option<Vec<usize>>;
}

/// The parameter / data keys of the ensemble configuration.
pub trait ParameterSet {
    fn has_key(&self, key: &str) -> bool;

    /// All parameter keys, sorted.
    fn keys(&self) -> Vec<String>;
}

/// In-memory observation catalog: key -> report steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observations {
    by_key: BTreeMap<String, BTreeSet<usize>>,
}

impl Observations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` with the report steps it has data for. Repeated
    /// inserts merge their steps.
    pub fn insert(&mut self, key: impl Into<String>, steps: impl IntoIterator<Item = usize>) {
        self.by_key.entry(key.into()).or_default().extend(steps);
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl ObservationSet for Observations {
    fn has_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        self.by_key.keys().cloned().collect()
    }

    fn steps(&self, key: &str) -> Option<Vec<usize>> {
        self.by_key
            .get(key)
            .map(|steps| steps.iter().copied().collect())
    }
}

/// In-memory parameter key set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterKeys(BTreeSet<String>);

impl ParameterKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.0.insert(key.into())
    }
}

impl<S: Into<String>> FromIterator<S> for ParameterKeys {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl ParameterSet for ParameterKeys {
    fn has_key(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    fn keys(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}
