//! ert-core: shared foundation for the ensemble run crates.
//!
//! Contains:
//! - error (shared error types)
//! - mask (active realization selection)

pub mod error;
pub mod mask;

pub use error::{CoreError, CoreResult};
pub use mask::ActiveRealizationMask;
