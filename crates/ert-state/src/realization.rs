//! Realization lifecycle states and the transition table.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::StateError;

/// Lifecycle state of one realization within a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RealizationState {
    #[default]
    Undefined,
    Initialized,
    HasData,
    LoadFailure,
    ParentFailure,
}

impl RealizationState {
    pub const ALL: [RealizationState; 5] = [
        RealizationState::Undefined,
        RealizationState::Initialized,
        RealizationState::HasData,
        RealizationState::LoadFailure,
        RealizationState::ParentFailure,
    ];

    /// Legal directed transitions; nothing ever returns to `Undefined` and
    /// self-transitions are not listed.
    pub fn is_legal_transition(from: RealizationState, to: RealizationState) -> bool {
        use RealizationState::*;
        matches!(
            (from, to),
            (Undefined, Initialized)
                | (Initialized, HasData)
                | (Initialized, LoadFailure)
                | (Initialized, ParentFailure)
                | (HasData, ParentFailure)
        )
    }

    pub fn can_transition_to(self, to: RealizationState) -> bool {
        Self::is_legal_transition(self, to)
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            RealizationState::LoadFailure | RealizationState::ParentFailure
        )
    }

    /// Classic bit code of the state (1, 2, 4, 8, 16).
    pub fn code(self) -> u32 {
        match self {
            RealizationState::Undefined => 1,
            RealizationState::Initialized => 2,
            RealizationState::HasData => 4,
            RealizationState::LoadFailure => 8,
            RealizationState::ParentFailure => 16,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RealizationState::Undefined => "UNDEFINED",
            RealizationState::Initialized => "INITIALIZED",
            RealizationState::HasData => "HAS_DATA",
            RealizationState::LoadFailure => "LOAD_FAILURE",
            RealizationState::ParentFailure => "PARENT_FAILURE",
        }
    }
}

impl fmt::Display for RealizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RealizationState {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = upper.strip_prefix("STATE_").unwrap_or(upper.as_str());
        RealizationState::ALL
            .into_iter()
            .find(|state| state.as_str() == name)
            .ok_or_else(|| StateError::UnknownState(s.to_string()))
    }
}

impl TryFrom<u32> for RealizationState {
    type Error = StateError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        RealizationState::ALL
            .into_iter()
            .find(|state| state.code() == code)
            .ok_or_else(|| StateError::UnknownState(code.to_string()))
    }
}

/// Set of states used for matching queries, stored as the OR of state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateSet(u32);

impl StateSet {
    pub const EMPTY: StateSet = StateSet(0);

    pub fn of(states: &[RealizationState]) -> Self {
        states.iter().fold(Self::EMPTY, |set, s| set.with(*s))
    }

    pub fn with(self, state: RealizationState) -> Self {
        Self(self.0 | state.code())
    }

    pub fn contains(self, state: RealizationState) -> bool {
        self.0 & state.code() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<RealizationState> for StateSet {
    fn from(state: RealizationState) -> Self {
        Self(state.code())
    }
}

impl core::ops::BitOr for RealizationState {
    type Output = StateSet;

    fn bitor(self, rhs: RealizationState) -> StateSet {
        StateSet::from(self).with(rhs)
    }
}

impl core::ops::BitOr<RealizationState> for StateSet {
    type Output = StateSet;

    fn bitor(self, rhs: RealizationState) -> StateSet {
        self.with(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::RealizationState::*;
    use super::*;

    const LEGAL: [(RealizationState, RealizationState); 5] = [
        (Undefined, Initialized),
        (Initialized, HasData),
        (Initialized, LoadFailure),
        (Initialized, ParentFailure),
        (HasData, ParentFailure),
    ];

    #[test]
    fn transition_table_is_exact() {
        for from in RealizationState::ALL {
            for to in RealizationState::ALL {
                let expected = LEGAL.contains(&(from, to));
                assert_eq!(
                    RealizationState::is_legal_transition(from, to),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn nothing_returns_to_undefined() {
        for from in RealizationState::ALL {
            assert!(!from.can_transition_to(Undefined));
        }
    }

    #[test]
    fn parse_names_and_codes() {
        assert_eq!("HAS_DATA".parse::<RealizationState>().unwrap(), HasData);
        assert_eq!(
            "state_parent_failure".parse::<RealizationState>().unwrap(),
            ParentFailure
        );
        assert_eq!(RealizationState::try_from(8).unwrap(), LoadFailure);

        assert!(matches!(
            "BOGUS".parse::<RealizationState>(),
            Err(StateError::UnknownState(_))
        ));
        assert!(matches!(
            RealizationState::try_from(3),
            Err(StateError::UnknownState(_))
        ));
    }

    #[test]
    fn state_set_matching() {
        let set = LoadFailure | ParentFailure;
        assert!(set.contains(LoadFailure));
        assert!(set.contains(ParentFailure));
        assert!(!set.contains(HasData));
        assert!(StateSet::EMPTY.is_empty());
        assert_eq!(StateSet::of(&[HasData, Initialized]), HasData | Initialized);
    }

    #[test]
    fn serializes_as_upper_case_names() {
        let json = serde_json::to_string(&[Undefined, HasData]).unwrap();
        assert_eq!(json, r#"["UNDEFINED","HAS_DATA"]"#);
    }
}
