//! Local configuration graph: obsdata, datasets, ministeps and the update step.
//!
//! Items are owned by [`LocalConfig`] and refer to each other by name, so the
//! graph is a plain tree of maps with no shared ownership. The analysis step
//! never sees the graph itself; it gets an owned [`UpdateSelection`].

use core::fmt;
use std::collections::BTreeMap;

use crate::{
    ActiveList, LocalObsdata, LocalObsdataNode, ObsError, ObsResult, ObservationSet,
    ParameterSet,
};

/// Name of the default ministep that selects every observation and parameter.
pub const ALL_ACTIVE: &str = "ALL_ACTIVE";

const ALL_OBS: &str = "ALL_OBS";
const ALL_DATA: &str = "ALL_DATA";
const DEFAULT_UPDATE_STEP: &str = "DEFAULT";

/// Named set of parameter keys updated together.
pub struct LocalDataset<'o> {
    name: String,
    parameters: &'o dyn ParameterSet,
    nodes: Vec<(String, ActiveList)>,
}

impl<'o> LocalDataset<'o> {
    pub fn new(name: impl Into<String>, parameters: &'o dyn ParameterSet) -> Self {
        Self {
            name: name.into(),
            parameters,
            nodes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_node(&mut self, key: &str) -> ObsResult<&mut ActiveList> {
        if !self.parameters.has_key(key) {
            return Err(ObsError::UnknownKey {
                key: key.to_string(),
                context: "ensemble parameters".to_string(),
            });
        }
        if self.contains(key) {
            return Err(ObsError::DuplicateKey {
                key: key.to_string(),
                context: format!("dataset {}", self.name),
            });
        }
        self.nodes.push((key.to_string(), ActiveList::AllActive));
        let last = self.nodes.len() - 1;
        Ok(&mut self.nodes[last].1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.iter().any(|(k, _)| k == key)
    }

    pub fn remove(&mut self, key: &str) -> ObsResult<()> {
        let index = self.require(key)?;
        self.nodes.remove(index);
        Ok(())
    }

    pub fn active_list(&self, key: &str) -> ObsResult<&ActiveList> {
        let index = self.require(key)?;
        Ok(&self.nodes[index].1)
    }

    pub fn active_list_mut(&mut self, key: &str) -> ObsResult<&mut ActiveList> {
        let index = self.require(key)?;
        Ok(&mut self.nodes[index].1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn require(&self, key: &str) -> ObsResult<usize> {
        self.nodes
            .iter()
            .position(|(k, _)| k == key)
            .ok_or_else(|| ObsError::UnknownKey {
                key: key.to_string(),
                context: format!("dataset {}", self.name),
            })
    }
}

impl fmt::Debug for LocalDataset<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDataset")
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .finish()
    }
}

/// One obsdata bound to the datasets it updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalMinistep {
    name: String,
    obsdata: Option<String>,
    datasets: Vec<String>,
}

impl LocalMinistep {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            obsdata: None,
            datasets: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn obsdata_name(&self) -> Option<&str> {
        self.obsdata.as_deref()
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().map(String::as_str)
    }
}

/// Ordered list of ministeps run by one analysis update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalUpdateStep {
    name: String,
    ministeps: Vec<String>,
}

impl LocalUpdateStep {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ministep_names(&self) -> impl Iterator<Item = &str> {
        self.ministeps.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ministeps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ministeps.is_empty()
    }
}

/// Owned snapshot of one ministep, handed to the analysis module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinistepSelection {
    pub name: String,
    pub observations: Vec<LocalObsdataNode>,
    pub parameters: Vec<(String, ActiveList)>,
}

/// Owned snapshot of the update step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSelection {
    ministeps: Vec<MinistepSelection>,
}

impl UpdateSelection {
    pub fn new(ministeps: Vec<MinistepSelection>) -> Self {
        Self { ministeps }
    }

    pub fn ministeps(&self) -> &[MinistepSelection] {
        &self.ministeps
    }

    pub fn len(&self) -> usize {
        self.ministeps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ministeps.is_empty()
    }

    /// Total number of observation nodes across all ministeps.
    pub fn observation_count(&self) -> usize {
        self.ministeps.iter().map(|m| m.observations.len()).sum()
    }
}

/// Owner of every local configuration item.
pub struct LocalConfig<'o> {
    observations: &'o dyn ObservationSet,
    parameters: &'o dyn ParameterSet,
    obsdata: BTreeMap<String, LocalObsdata<'o>>,
    datasets: BTreeMap<String, LocalDataset<'o>>,
    ministeps: BTreeMap<String, LocalMinistep>,
    update_step: LocalUpdateStep,
}

impl<'o> LocalConfig<'o> {
    /// Empty configuration: the update step has no ministeps.
    pub fn new(observations: &'o dyn ObservationSet, parameters: &'o dyn ParameterSet) -> Self {
        Self {
            observations,
            parameters,
            obsdata: BTreeMap::new(),
            datasets: BTreeMap::new(),
            ministeps: BTreeMap::new(),
            update_step: LocalUpdateStep {
                name: DEFAULT_UPDATE_STEP.to_string(),
                ministeps: Vec::new(),
            },
        }
    }

    /// Default configuration: one [`ALL_ACTIVE`] ministep with every
    /// observation and every parameter.
    pub fn all_active(
        observations: &'o dyn ObservationSet,
        parameters: &'o dyn ParameterSet,
    ) -> ObsResult<Self> {
        let mut config = Self::new(observations, parameters);

        let obsdata = config.create_obsdata(ALL_OBS)?;
        for key in observations.keys() {
            obsdata.add_node(&key, true)?;
        }
        let dataset = config.create_dataset(ALL_DATA)?;
        for key in parameters.keys() {
            dataset.add_node(&key)?;
        }

        config.create_ministep(ALL_ACTIVE)?;
        config.attach_obsdata(ALL_ACTIVE, ALL_OBS)?;
        config.attach_dataset(ALL_ACTIVE, ALL_DATA)?;
        config.attach_ministep(ALL_ACTIVE)?;
        Ok(config)
    }

    /// Drop every item, leaving an empty update step.
    pub fn clear(&mut self) {
        self.obsdata.clear();
        self.datasets.clear();
        self.ministeps.clear();
        self.update_step.ministeps.clear();
    }

    pub fn create_obsdata(&mut self, name: &str) -> ObsResult<&mut LocalObsdata<'o>> {
        if self.obsdata.contains_key(name) {
            return Err(duplicate("obsdata", name));
        }
        let observations = self.observations;
        Ok(self
            .obsdata
            .entry(name.to_string())
            .or_insert_with(|| LocalObsdata::new(name, observations)))
    }

    pub fn create_dataset(&mut self, name: &str) -> ObsResult<&mut LocalDataset<'o>> {
        if self.datasets.contains_key(name) {
            return Err(duplicate("dataset", name));
        }
        let parameters = self.parameters;
        Ok(self
            .datasets
            .entry(name.to_string())
            .or_insert_with(|| LocalDataset::new(name, parameters)))
    }

    pub fn create_ministep(&mut self, name: &str) -> ObsResult<&LocalMinistep> {
        if self.ministeps.contains_key(name) {
            return Err(duplicate("ministep", name));
        }
        let step: &LocalMinistep = self
            .ministeps
            .entry(name.to_string())
            .or_insert_with(|| LocalMinistep::new(name));
        Ok(step)
    }

    pub fn obsdata(&self, name: &str) -> ObsResult<&LocalObsdata<'o>> {
        self.obsdata.get(name).ok_or_else(|| unknown("obsdata", name))
    }

    pub fn obsdata_mut(&mut self, name: &str) -> ObsResult<&mut LocalObsdata<'o>> {
        self.obsdata
            .get_mut(name)
            .ok_or_else(|| unknown("obsdata", name))
    }

    pub fn dataset(&self, name: &str) -> ObsResult<&LocalDataset<'o>> {
        self.datasets.get(name).ok_or_else(|| unknown("dataset", name))
    }

    pub fn dataset_mut(&mut self, name: &str) -> ObsResult<&mut LocalDataset<'o>> {
        self.datasets
            .get_mut(name)
            .ok_or_else(|| unknown("dataset", name))
    }

    pub fn ministep(&self, name: &str) -> ObsResult<&LocalMinistep> {
        self.ministeps
            .get(name)
            .ok_or_else(|| unknown("ministep", name))
    }

    pub fn update_step(&self) -> &LocalUpdateStep {
        &self.update_step
    }

    /// Bind `obsdata` to `ministep`; a ministep holds at most one obsdata.
    pub fn attach_obsdata(&mut self, ministep: &str, obsdata: &str) -> ObsResult<()> {
        if !self.obsdata.contains_key(obsdata) {
            return Err(unknown("obsdata", obsdata));
        }
        let step = self
            .ministeps
            .get_mut(ministep)
            .ok_or_else(|| unknown("ministep", ministep))?;
        if let Some(existing) = &step.obsdata {
            return Err(ObsError::AlreadyAttached {
                kind: "obsdata",
                name: existing.clone(),
                parent: ministep.to_string(),
            });
        }
        step.obsdata = Some(obsdata.to_string());
        Ok(())
    }

    pub fn attach_dataset(&mut self, ministep: &str, dataset: &str) -> ObsResult<()> {
        if !self.datasets.contains_key(dataset) {
            return Err(unknown("dataset", dataset));
        }
        let step = self
            .ministeps
            .get_mut(ministep)
            .ok_or_else(|| unknown("ministep", ministep))?;
        if step.datasets.iter().any(|d| d == dataset) {
            return Err(ObsError::AlreadyAttached {
                kind: "dataset",
                name: dataset.to_string(),
                parent: ministep.to_string(),
            });
        }
        step.datasets.push(dataset.to_string());
        Ok(())
    }

    /// Append `ministep` to the update step.
    pub fn attach_ministep(&mut self, ministep: &str) -> ObsResult<()> {
        if !self.ministeps.contains_key(ministep) {
            return Err(unknown("ministep", ministep));
        }
        if self.update_step.ministeps.iter().any(|m| m == ministep) {
            return Err(ObsError::AlreadyAttached {
                kind: "ministep",
                name: ministep.to_string(),
                parent: self.update_step.name.clone(),
            });
        }
        self.update_step.ministeps.push(ministep.to_string());
        Ok(())
    }

    /// Owned snapshot of the update step, in ministep order.
    pub fn update_selection(&self) -> UpdateSelection {
        let ministeps = self
            .update_step
            .ministeps
            .iter()
            .filter_map(|name| self.ministeps.get(name))
            .map(|step| MinistepSelection {
                name: step.name.clone(),
                observations: step
                    .obsdata
                    .as_deref()
                    .and_then(|name| self.obsdata.get(name))
                    .map(|obsdata| obsdata.nodes().to_vec())
                    .unwrap_or_default(),
                parameters: step
                    .datasets
                    .iter()
                    .filter_map(|name| self.datasets.get(name))
                    .flat_map(|dataset| dataset.nodes.iter().cloned())
                    .collect(),
            })
            .collect();
        UpdateSelection { ministeps }
    }
}

impl fmt::Debug for LocalConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConfig")
            .field("obsdata", &self.obsdata)
            .field("datasets", &self.datasets)
            .field("ministeps", &self.ministeps)
            .field("update_step", &self.update_step)
            .finish()
    }
}

fn unknown(kind: &'static str, name: &str) -> ObsError {
    ObsError::UnknownName {
        kind,
        name: name.to_string(),
    }
}

fn duplicate(kind: &'static str, name: &str) -> ObsError {
    ObsError::DuplicateName {
        kind,
        name: name.to_string(),
    }
}
