//! Named, ordered selection of observation keys.

use core::fmt;
use std::ops::RangeInclusive;

use crate::{ActiveList, ObsError, ObsResult, ObservationSet};

/// One selected observation key, optionally limited to some report steps.
///
/// Steps are kept as sorted, disjoint, non-adjacent inclusive ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalObsdataNode {
    key: String,
    active_list: ActiveList,
    all_timesteps: bool,
    steps: Vec<RangeInclusive<usize>>,
}

impl LocalObsdataNode {
    pub fn new(key: impl Into<String>, all_timesteps: bool) -> Self {
        Self {
            key: key.into(),
            active_list: ActiveList::AllActive,
            all_timesteps,
            steps: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn active_list(&self) -> &ActiveList {
        &self.active_list
    }

    pub fn active_list_mut(&mut self) -> &mut ActiveList {
        &mut self.active_list
    }

    pub fn all_timesteps_active(&self) -> bool {
        self.all_timesteps
    }

    pub fn set_all_timesteps_active(&mut self, active: bool) {
        self.all_timesteps = active;
    }

    /// Activate a single report step; the node stops tracking "all steps".
    pub fn add_time_step(&mut self, step: usize) {
        self.all_timesteps = false;
        self.insert_range(step, step);
    }

    /// Activate the inclusive range `[start, end]`.
    pub fn add_range(&mut self, start: usize, end: usize) -> ObsResult<()> {
        if start > end {
            return Err(ObsError::InvalidRange { start, end });
        }
        self.all_timesteps = false;
        self.insert_range(start, end);
        Ok(())
    }

    pub fn is_step_active(&self, step: usize) -> bool {
        if self.all_timesteps {
            return true;
        }
        let next = self.steps.partition_point(|range| *range.end() < step);
        self.steps.get(next).is_some_and(|range| range.contains(&step))
    }

    /// Explicitly listed steps as merged ranges. Empty when all steps are
    /// active.
    pub fn ranges(&self) -> &[RangeInclusive<usize>] {
        &self.steps
    }

    /// Explicitly listed steps, ascending. Empty when all steps are active.
    pub fn steps(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps.iter().flat_map(|range| range.clone())
    }

    fn reset_steps(&mut self, steps: &[usize]) {
        self.all_timesteps = false;
        self.steps.clear();
        for &step in steps {
            self.insert_range(step, step);
        }
    }

    fn insert_range(&mut self, mut start: usize, mut end: usize) {
        let mut merged = Vec::with_capacity(self.steps.len() + 1);
        let mut placed = false;
        for range in std::mem::take(&mut self.steps) {
            let (lo, hi) = (*range.start(), *range.end());
            if hi.saturating_add(1) < start {
                merged.push(range);
            } else if end.saturating_add(1) < lo {
                if !placed {
                    merged.push(start..=end);
                    placed = true;
                }
                merged.push(range);
            } else {
                start = start.min(lo);
                end = end.max(hi);
            }
        }
        if !placed {
            merged.push(start..=end);
        }
        self.steps = merged;
    }
}

impl AsRef<str> for LocalObsdataNode {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

/// Ordered, unique-by-key set of [`LocalObsdataNode`]s.
///
/// Every key must exist in the backing [`ObservationSet`], which is borrowed
/// for validation only.
pub struct LocalObsdata<'o> {
    name: String,
    observations: &'o dyn ObservationSet,
    nodes: Vec<LocalObsdataNode>,
}

impl<'o> LocalObsdata<'o> {
    pub fn new(name: impl Into<String>, observations: &'o dyn ObservationSet) -> Self {
        Self {
            name: name.into(),
            observations,
            nodes: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(
        &mut self,
        key: &str,
        add_all_timesteps: bool,
    ) -> ObsResult<&mut LocalObsdataNode> {
        self.check_insertable(key)?;
        self.nodes.push(LocalObsdataNode::new(key, add_all_timesteps));
        let last = self.nodes.len() - 1;
        Ok(&mut self.nodes[last])
    }

    /// Add `key` active over the inclusive report-step range `[start, end]`.
    ///
    /// Nothing is added when the range is invalid.
    pub fn add_node_and_range(
        &mut self,
        key: &str,
        start: usize,
        end: usize,
    ) -> ObsResult<&mut LocalObsdataNode> {
        self.check_insertable(key)?;
        let mut node = LocalObsdataNode::new(key, false);
        node.add_range(start, end)?;
        self.nodes.push(node);
        let last = self.nodes.len() - 1;
        Ok(&mut self.nodes[last])
    }

    /// Accepts a key or a node.
    pub fn contains(&self, key: impl AsRef<str>) -> bool {
        self.position(key.as_ref()).is_some()
    }

    pub fn get(&self, key: &str) -> ObsResult<&LocalObsdataNode> {
        let index = self.require(key)?;
        Ok(&self.nodes[index])
    }

    pub fn get_mut(&mut self, key: &str) -> ObsResult<&mut LocalObsdataNode> {
        let index = self.require(key)?;
        Ok(&mut self.nodes[index])
    }

    pub fn remove(&mut self, key: &str) -> ObsResult<LocalObsdataNode> {
        let index = self.require(key)?;
        Ok(self.nodes.remove(index))
    }

    pub fn active_list(&self, key: &str) -> ObsResult<&ActiveList> {
        self.get(key).map(LocalObsdataNode::active_list)
    }

    pub fn active_list_mut(&mut self, key: &str) -> ObsResult<&mut ActiveList> {
        self.get_mut(key).map(LocalObsdataNode::active_list_mut)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Nodes in insertion order; call again to restart.
    pub fn iter(&self) -> std::slice::Iter<'_, LocalObsdataNode> {
        self.nodes.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(LocalObsdataNode::key)
    }

    /// Force the same explicit report steps onto every node.
    pub fn reset_tstep_list(&mut self, steps: &[usize]) {
        for node in &mut self.nodes {
            node.reset_steps(steps);
        }
    }

    pub(crate) fn nodes(&self) -> &[LocalObsdataNode] {
        &self.nodes
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.key == key)
    }

    fn require(&self, key: &str) -> ObsResult<usize> {
        self.position(key).ok_or_else(|| ObsError::UnknownKey {
            key: key.to_string(),
            context: format!("obsdata {}", self.name),
        })
    }

    fn check_insertable(&self, key: &str) -> ObsResult<()> {
        if !self.observations.has_key(key) {
            return Err(ObsError::UnknownKey {
                key: key.to_string(),
                context: "observations".to_string(),
            });
        }
        if self.position(key).is_some() {
            return Err(ObsError::DuplicateKey {
                key: key.to_string(),
                context: format!("obsdata {}", self.name),
            });
        }
        Ok(())
    }
}

impl<'a, 'o> IntoIterator for &'a LocalObsdata<'o> {
    type Item = &'a LocalObsdataNode;
    type IntoIter = std::slice::Iter<'a, LocalObsdataNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl fmt::Debug for LocalObsdata<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalObsdata")
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Observations;

    fn observations() -> Observations {
        let mut obs = Observations::new();
        obs.insert("WOPR_OP1", [10, 20, 30]);
        obs.insert("WWCT_OP1", [20]);
        obs.insert("RFT_P1", [5]);
        obs
    }

    #[test]
    fn add_node_requires_known_key() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);

        let err = obsdata.add_node("NOT_THERE", true).unwrap_err();
        assert!(matches!(err, ObsError::UnknownKey { .. }));
        assert!(obsdata.is_empty());
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);

        obsdata.add_node("WOPR_OP1", true).unwrap();
        assert_eq!(obsdata.len(), 1);
        let err = obsdata.add_node("WOPR_OP1", true).unwrap_err();
        assert!(matches!(err, ObsError::DuplicateKey { .. }));
        assert_eq!(obsdata.len(), 1);
    }

    #[test]
    fn add_node_and_range_restricts_steps() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);

        let node = obsdata.add_node_and_range("WOPR_OP1", 10, 12).unwrap();
        assert!(!node.all_timesteps_active());
        assert_eq!(node.steps().collect::<Vec<_>>(), vec![10, 11, 12]);
        assert!(node.is_step_active(11));
        assert!(!node.is_step_active(20));
    }

    #[test]
    fn wide_range_is_stored_as_one_interval() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);

        let node = obsdata.add_node_and_range("WOPR_OP1", 0, usize::MAX).unwrap();
        assert_eq!(node.ranges(), &[0..=usize::MAX]);
        assert!(node.is_step_active(0));
        assert!(node.is_step_active(usize::MAX));
    }

    #[test]
    fn overlapping_and_adjacent_steps_merge() {
        let mut node = LocalObsdataNode::new("WOPR_OP1", true);
        node.add_range(10, 20).unwrap();
        node.add_range(30, 40).unwrap();
        node.add_time_step(5);
        assert_eq!(node.ranges(), &[5..=5, 10..=20, 30..=40]);

        node.add_range(21, 29).unwrap();
        node.add_time_step(6);
        assert_eq!(node.ranges(), &[5..=6, 10..=40]);

        node.add_range(0, 100).unwrap();
        assert_eq!(node.ranges(), &[0..=100]);
        assert!(!node.is_step_active(101));
    }

    #[test]
    fn bad_range_adds_nothing() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);

        let err = obsdata.add_node_and_range("WOPR_OP1", 5, 2).unwrap_err();
        assert_eq!(err, ObsError::InvalidRange { start: 5, end: 2 });
        assert!(!obsdata.contains("WOPR_OP1"));
    }

    #[test]
    fn contains_accepts_key_or_node() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);
        obsdata.add_node("WWCT_OP1", true).unwrap();

        let node = LocalObsdataNode::new("WWCT_OP1", true);
        assert!(obsdata.contains("WWCT_OP1"));
        assert!(obsdata.contains(&node));
        assert!(!obsdata.contains("WOPR_OP1"));
    }

    #[test]
    fn remove_and_lookup_unknown_keys() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);
        obsdata.add_node("WWCT_OP1", true).unwrap();

        assert!(matches!(
            obsdata.remove("WOPR_OP1"),
            Err(ObsError::UnknownKey { .. })
        ));
        assert!(matches!(
            obsdata.active_list("WOPR_OP1"),
            Err(ObsError::UnknownKey { .. })
        ));

        let removed = obsdata.remove("WWCT_OP1").unwrap();
        assert_eq!(removed.key(), "WWCT_OP1");
        assert!(obsdata.is_empty());
    }

    #[test]
    fn iteration_is_insertion_ordered_and_restartable() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);
        for key in ["WWCT_OP1", "RFT_P1", "WOPR_OP1"] {
            obsdata.add_node(key, true).unwrap();
        }

        let first: Vec<&str> = obsdata.iter().map(LocalObsdataNode::key).collect();
        let second: Vec<&str> = (&obsdata).into_iter().map(|n| n.key()).collect();
        assert_eq!(first, vec!["WWCT_OP1", "RFT_P1", "WOPR_OP1"]);
        assert_eq!(first, second);

        obsdata.clear();
        assert_eq!(obsdata.iter().count(), 0);
    }

    #[test]
    fn active_list_is_editable_per_key() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);
        obsdata.add_node("RFT_P1", true).unwrap();

        obsdata.active_list_mut("RFT_P1").unwrap().add_index(2);
        let list = obsdata.active_list("RFT_P1").unwrap();
        assert!(list.is_active(2));
        assert!(!list.is_active(0));
    }

    #[test]
    fn reset_tstep_list_overrides_all_nodes() {
        let obs = observations();
        let mut obsdata = LocalObsdata::new("OBS", &obs);
        obsdata.add_node("WOPR_OP1", true).unwrap();
        obsdata.add_node_and_range("WWCT_OP1", 1, 3).unwrap();

        obsdata.reset_tstep_list(&[20]);
        for node in &obsdata {
            assert!(!node.all_timesteps_active());
            assert_eq!(node.steps().collect::<Vec<_>>(), vec![20]);
        }
    }
}
