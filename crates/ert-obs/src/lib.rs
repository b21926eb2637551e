//! Observation selection for update steps.
//!
//! This crate describes *which* observations and parameters take part in an
//! analysis update. It owns no observation data: selections are validated
//! against external collaborators ([`ObservationSet`], [`ParameterSet`]).
//!
//! # Structure
//!
//! - [`LocalObsdata`]: ordered, unique-by-key set of [`LocalObsdataNode`]s
//! - [`LocalDataset`]: parameter keys updated together
//! - [`LocalMinistep`]: one obsdata bound to any number of datasets
//! - [`LocalConfig`]: owns all of the above plus the update step, and hands
//!   out an owned [`UpdateSelection`] snapshot for the analysis module

pub mod active_list;
pub mod error;
pub mod local_config;
pub mod local_obsdata;
pub mod observations;

pub use active_list::ActiveList;
pub use error::{ObsError, ObsResult};
pub use local_config::{
    LocalConfig, LocalDataset, LocalMinistep, LocalUpdateStep, MinistepSelection,
    UpdateSelection, ALL_ACTIVE,
};
pub use local_obsdata::{LocalObsdata, LocalObsdataNode};
pub use observations::{ObservationSet, Observations, ParameterKeys, ParameterSet};
