use core::fmt;

use crate::{CoreError, CoreResult};

/// Fixed-length selection of the realizations taking part in a run.
///
/// - one entry per ensemble member
/// - produced by the caller, read-only for the run models
#[derive(Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActiveRealizationMask(Vec<bool>);

impl ActiveRealizationMask {
    /// Mask of `len` realizations, all set to `active`.
    pub fn new(len: usize, active: bool) -> Self {
        Self(vec![active; len])
    }

    /// Mask with every realization active.
    pub fn all(len: usize) -> Self {
        Self::new(len, true)
    }

    /// Mask of `len` realizations where only `indices` are active.
    pub fn from_indices(len: usize, indices: &[usize]) -> CoreResult<Self> {
        let mut mask = Self::new(len, false);
        for &index in indices {
            mask.set(index, true)?;
        }
        Ok(mask)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Out-of-range indices read as inactive.
    pub fn is_active(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    pub fn set(&mut self, index: usize, active: bool) -> CoreResult<()> {
        let len = self.0.len();
        let slot = self.0.get_mut(index).ok_or(CoreError::IndexOob {
            what: "active realization mask",
            index,
            len,
        })?;
        *slot = active;
        Ok(())
    }

    pub fn count_active(&self) -> usize {
        self.0.iter().filter(|active| **active).count()
    }

    /// Indices of the active realizations, ascending.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(index, active)| active.then_some(index))
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }
}

impl From<Vec<bool>> for ActiveRealizationMask {
    fn from(value: Vec<bool>) -> Self {
        Self(value)
    }
}

impl fmt::Debug for ActiveRealizationMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: String = self.0.iter().map(|a| if *a { '1' } else { '0' }).collect();
        write!(f, "ActiveRealizationMask({bits})")
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn active_indices_agree_with_count(bits in prop::collection::vec(any::<bool>(), 0..64)) {
            let mask = ActiveRealizationMask::from(bits.clone());
            let indices: Vec<usize> = mask.active_indices().collect();
            prop_assert_eq!(indices.len(), mask.count_active());
            for index in indices {
                prop_assert!(bits[index]);
            }
        }
    }
}
