//! Selection of active data indices inside one observation or parameter.

use std::collections::BTreeSet;

/// Which elements of a vector-valued observation (or parameter) are active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveList {
    /// Every element is active.
    #[default]
    AllActive,
    /// Only the listed elements are active.
    PartlyActive(BTreeSet<usize>),
    /// Nothing is active.
    Inactive,
}

impl ActiveList {
    /// Restrict to an explicit index set; switching from `AllActive` drops
    /// the implicit "everything" selection.
    pub fn add_index(&mut self, index: usize) {
        match self {
            ActiveList::PartlyActive(indices) => {
                indices.insert(index);
            }
            ActiveList::AllActive | ActiveList::Inactive => {
                *self = ActiveList::PartlyActive(BTreeSet::from([index]));
            }
        }
    }

    pub fn is_active(&self, index: usize) -> bool {
        match self {
            ActiveList::AllActive => true,
            ActiveList::PartlyActive(indices) => indices.contains(&index),
            ActiveList::Inactive => false,
        }
    }

    /// Number of active elements for a vector of `total` elements.
    pub fn active_size(&self, total: usize) -> usize {
        match self {
            ActiveList::AllActive => total,
            ActiveList::PartlyActive(indices) => indices.range(..total).count(),
            ActiveList::Inactive => 0,
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            ActiveList::AllActive => "ALL_ACTIVE",
            ActiveList::PartlyActive(_) => "PARTLY_ACTIVE",
            ActiveList::Inactive => "INACTIVE",
        }
    }
}
