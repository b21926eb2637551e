//! Growable per-realization state vector with validated writes.

use std::fs;
use std::path::Path;

use ert_core::ActiveRealizationMask;
use serde::{Deserialize, Serialize};

use crate::{RealizationState, StateError, StateResult, StateSet};

/// Lifecycle state of every realization in one case.
///
/// Indices run contiguously from 0 to `len() - 1`. Slots that were never
/// written read as [`RealizationState::Undefined`]; writing past the end
/// grows the map first. Equality only looks at the states, not at the
/// read-only flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateMap {
    #[serde(default)]
    read_only: bool,
    states: Vec<RealizationState>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freeze the map; every later mutation fails with [`StateError::ReadOnly`].
    pub fn mark_read_only(&mut self) {
        self.read_only = true;
    }

    pub fn get(&self, index: usize) -> StateResult<RealizationState> {
        self.states
            .get(index)
            .copied()
            .ok_or(StateError::IndexOutOfRange {
                index,
                len: self.states.len(),
            })
    }

    /// Grow the map to at least `len` slots, filling with `Undefined`.
    pub fn ensure_len(&mut self, len: usize) -> StateResult<()> {
        self.check_writable("extend the map")?;
        if len > self.states.len() {
            self.states.resize(len, RealizationState::Undefined);
        }
        Ok(())
    }

    /// Write `state` at `index`, growing the map when needed.
    ///
    /// The transition from the slot's current state must be legal; a failed
    /// write leaves the map untouched (including its length).
    pub fn set(&mut self, index: usize, state: RealizationState) -> StateResult<()> {
        self.check_writable("set a realization state")?;
        let current = self.state_or_undefined(index);
        if !current.can_transition_to(state) {
            return Err(StateError::IllegalTransition {
                index,
                from: current,
                to: state,
            });
        }
        let len = index.checked_add(1).ok_or(StateError::IndexOutOfRange {
            index,
            len: self.states.len(),
        })?;
        self.ensure_len(len)?;
        self.states[index] = state;
        Ok(())
    }

    /// Write `state` only when the slot is still `Undefined`.
    ///
    /// Returns whether a write happened.
    pub fn update_undefined(&mut self, index: usize, state: RealizationState) -> StateResult<bool> {
        if self.state_or_undefined(index) != RealizationState::Undefined {
            return Ok(false);
        }
        self.set(index, state)?;
        Ok(true)
    }

    /// Indices currently holding `state`, ascending.
    pub fn realization_list(&self, state: RealizationState) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(index, s)| (*s == state).then_some(index))
            .collect()
    }

    pub fn count_matching(&self, states: impl Into<StateSet>) -> usize {
        let states = states.into();
        self.states.iter().filter(|s| states.contains(**s)).count()
    }

    /// Activate in `mask` every realization whose state is in `states`.
    ///
    /// Realizations in other states are deactivated; mask entries beyond the
    /// end of the map count as `Undefined`.
    pub fn select_matching(&self, mask: &mut ActiveRealizationMask, states: impl Into<StateSet>) {
        let states = states.into();
        for index in 0..mask.len() {
            let matches = states.contains(self.state_or_undefined(index));
            // index < mask.len(), set cannot fail
            let _ = mask.set(index, matches);
        }
    }

    /// Deactivate in `mask` every realization whose state is in `states`.
    pub fn deselect_matching(
        &self,
        mask: &mut ActiveRealizationMask,
        states: impl Into<StateSet>,
    ) {
        let states = states.into();
        for index in 0..mask.len() {
            if states.contains(self.state_or_undefined(index)) {
                let _ = mask.set(index, false);
            }
        }
    }

    /// Set every active realization of `mask` to `state`.
    pub fn set_from_mask(
        &mut self,
        mask: &ActiveRealizationMask,
        state: RealizationState,
    ) -> StateResult<()> {
        let indices: Vec<usize> = mask.active_indices().collect();
        self.set_many(&indices, state)
    }

    /// Set every inactive realization of `mask` to `state`.
    pub fn set_from_inverted_mask(
        &mut self,
        mask: &ActiveRealizationMask,
        state: RealizationState,
    ) -> StateResult<()> {
        let indices: Vec<usize> = (0..mask.len()).filter(|i| !mask.is_active(*i)).collect();
        self.set_many(&indices, state)
    }

    /// Mark active realizations `Initialized` where `source` holds usable
    /// parameters (`Initialized` or `HasData`) and this map is still `Undefined`.
    ///
    /// Returns the number of realizations that were initialized.
    pub fn initialize_from(
        &mut self,
        source: &StateMap,
        mask: &ActiveRealizationMask,
    ) -> StateResult<usize> {
        self.check_writable("initialize from another case")?;
        let usable = RealizationState::Initialized | RealizationState::HasData;
        let mut initialized = 0;
        for index in mask.active_indices() {
            if usable.contains(source.state_or_undefined(index))
                && self.update_undefined(index, RealizationState::Initialized)?
            {
                initialized += 1;
            }
        }
        Ok(initialized)
    }

    /// Discard every state, then seed again from `source` like
    /// [`StateMap::initialize_from`].
    ///
    /// The dropped states are not transitions, so the table does not apply
    /// to them.
    pub fn reinitialize_from(
        &mut self,
        source: &StateMap,
        mask: &ActiveRealizationMask,
    ) -> StateResult<usize> {
        self.check_writable("reinitialize from another case")?;
        self.states.clear();
        self.initialize_from(source, mask)
    }

    pub fn iter(&self) -> impl Iterator<Item = RealizationState> + '_ {
        self.states.iter().copied()
    }

    pub fn as_slice(&self) -> &[RealizationState] {
        &self.states
    }

    /// Persist the states and the read-only flag as JSON.
    pub fn save(&self, path: &Path) -> StateResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| StateError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> StateResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StateError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a snapshot that must not be modified, whatever its stored flag.
    pub fn load_read_only(path: &Path) -> StateResult<Self> {
        let mut map = Self::load(path)?;
        map.mark_read_only();
        Ok(map)
    }

    fn state_or_undefined(&self, index: usize) -> RealizationState {
        self.states.get(index).copied().unwrap_or_default()
    }

    fn check_writable(&self, operation: &'static str) -> StateResult<()> {
        if self.read_only {
            return Err(StateError::ReadOnly { operation });
        }
        Ok(())
    }

    fn set_many(&mut self, indices: &[usize], state: RealizationState) -> StateResult<()> {
        self.check_writable("set realization states from a mask")?;
        // Validate everything first so a bad slot leaves the map untouched.
        for &index in indices {
            let current = self.state_or_undefined(index);
            if current != state && !current.can_transition_to(state) {
                return Err(StateError::IllegalTransition {
                    index,
                    from: current,
                    to: state,
                });
            }
        }
        for &index in indices {
            if self.state_or_undefined(index) != state {
                self.set(index, state)?;
            }
        }
        Ok(())
    }
}

impl PartialEq for StateMap {
    fn eq(&self, other: &Self) -> bool {
        self.states == other.states
    }
}

impl Eq for StateMap {}

impl FromIterator<RealizationState> for StateMap {
    fn from_iter<I: IntoIterator<Item = RealizationState>>(iter: I) -> Self {
        Self {
            read_only: false,
            states: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RealizationState::*;

    #[test]
    fn unset_slots_read_undefined() {
        let mut map = StateMap::new();
        map.set(4, Initialized).unwrap();
        assert_eq!(map.len(), 5);
        for index in 0..4 {
            assert_eq!(map.get(index).unwrap(), Undefined);
        }
        assert_eq!(map.get(4).unwrap(), Initialized);
    }

    #[test]
    fn get_beyond_len_fails() {
        let map = StateMap::new();
        assert!(matches!(
            map.get(0),
            Err(StateError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn largest_index_is_out_of_range() {
        let mut map = StateMap::new();
        let err = map.set(usize::MAX, Initialized).unwrap_err();
        assert!(matches!(
            err,
            StateError::IndexOutOfRange {
                index: usize::MAX,
                len: 0
            }
        ));
        assert!(map.is_empty());
    }

    #[test]
    fn illegal_transition_is_rejected_without_growing() {
        let mut map = StateMap::new();
        let err = map.set(3, HasData).unwrap_err();
        assert!(matches!(
            err,
            StateError::IllegalTransition {
                index: 3,
                from: Undefined,
                to: HasData
            }
        ));
        assert_eq!(map.len(), 0);

        map.set(0, Initialized).unwrap();
        map.set(0, HasData).unwrap();
        assert!(map.set(0, Initialized).is_err());
        assert_eq!(map.get(0).unwrap(), HasData);
    }

    #[test]
    fn read_only_refuses_every_mutation() {
        let mut map: StateMap = [Initialized, HasData].into_iter().collect();
        map.mark_read_only();

        let err = map.set(0, HasData).unwrap_err();
        assert!(err.is_warning());
        assert!(map.ensure_len(10).is_err());
        assert!(
            map.set_from_mask(&ActiveRealizationMask::all(2), ParentFailure)
                .is_err()
        );
        assert_eq!(map.as_slice(), &[Initialized, HasData]);
    }

    #[test]
    fn realization_list_and_counts() {
        let mut map = StateMap::new();
        for index in 0..6 {
            map.set(index, Initialized).unwrap();
        }
        map.set(1, HasData).unwrap();
        map.set(4, HasData).unwrap();
        map.set(5, LoadFailure).unwrap();

        assert_eq!(map.realization_list(HasData), vec![1, 4]);
        assert_eq!(map.realization_list(Initialized), vec![0, 2, 3]);
        assert_eq!(map.count_matching(HasData), 2);
        assert_eq!(map.count_matching(LoadFailure | ParentFailure), 1);
    }

    #[test]
    fn select_and_deselect_matching() {
        let map: StateMap = [HasData, LoadFailure, HasData].into_iter().collect();

        let mut mask = ActiveRealizationMask::new(5, false);
        map.select_matching(&mut mask, HasData);
        assert_eq!(mask.active_indices().collect::<Vec<_>>(), vec![0, 2]);

        let mut mask = ActiveRealizationMask::all(5);
        map.deselect_matching(&mut mask, LoadFailure | ParentFailure);
        assert_eq!(mask.active_indices().collect::<Vec<_>>(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn mask_writes_skip_slots_already_in_state() {
        let mut map: StateMap = [Initialized, HasData, Undefined].into_iter().collect();
        let mask = ActiveRealizationMask::from_indices(3, &[0, 1]).unwrap();

        map.set_from_mask(&mask, ParentFailure).unwrap();
        map.set_from_mask(&mask, ParentFailure).unwrap();
        assert_eq!(map.as_slice(), &[ParentFailure, ParentFailure, Undefined]);

        // Undefined -> HasData is illegal; nothing is written.
        let mut map: StateMap = [Initialized, Undefined].into_iter().collect();
        let all = ActiveRealizationMask::all(2);
        assert!(map.set_from_mask(&all, HasData).is_err());
        assert_eq!(map.as_slice(), &[Initialized, Undefined]);
    }

    #[test]
    fn inverted_mask_targets_inactive() {
        let mut map: StateMap = [Initialized, Initialized, Initialized].into_iter().collect();
        let mask = ActiveRealizationMask::from_indices(3, &[1]).unwrap();
        map.set_from_inverted_mask(&mask, ParentFailure).unwrap();
        assert_eq!(map.as_slice(), &[ParentFailure, Initialized, ParentFailure]);
    }

    #[test]
    fn initialize_from_source_case() {
        let source: StateMap = [HasData, LoadFailure, Initialized, HasData]
            .into_iter()
            .collect();
        let mask = ActiveRealizationMask::from_indices(4, &[0, 1, 2]).unwrap();

        let mut target = StateMap::new();
        let initialized = target.initialize_from(&source, &mask).unwrap();
        assert_eq!(initialized, 2);
        assert_eq!(target.as_slice(), &[Initialized, Undefined, Initialized]);

        // A second pass finds nothing left to do.
        assert_eq!(target.initialize_from(&source, &mask).unwrap(), 0);
    }

    #[test]
    fn reinitialize_discards_existing_states() {
        let source: StateMap = [HasData, LoadFailure, Initialized].into_iter().collect();
        let mask = ActiveRealizationMask::all(3);

        let mut target: StateMap = [HasData, ParentFailure, Initialized, HasData]
            .into_iter()
            .collect();
        assert_eq!(target.initialize_from(&source, &mask).unwrap(), 0);

        let initialized = target.reinitialize_from(&source, &mask).unwrap();
        assert_eq!(initialized, 2);
        assert_eq!(target.as_slice(), &[Initialized, Undefined, Initialized]);

        target.mark_read_only();
        assert!(target.reinitialize_from(&source, &mask).unwrap_err().is_warning());
        assert_eq!(target.len(), 3);
    }

    #[test]
    fn equality_ignores_read_only_flag() {
        let a: StateMap = [Initialized, HasData].into_iter().collect();
        let mut b = a.clone();
        b.mark_read_only();
        assert_eq!(a, b);

        let c: StateMap = [Initialized].into_iter().collect();
        assert_ne!(a, c);
    }
}
