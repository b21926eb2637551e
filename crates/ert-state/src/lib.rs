//! ert-state: per-realization lifecycle tracking.
//!
//! A [`StateMap`] records one [`RealizationState`] per ensemble member of a
//! case. Every write is checked against the legal transition table, and maps
//! loaded from an immutable snapshot refuse mutation altogether.

pub mod error;
pub mod realization;
pub mod state_map;

pub use error::{StateError, StateResult};
pub use realization::{RealizationState, StateSet};
pub use state_map::StateMap;
